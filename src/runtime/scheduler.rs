use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::runtime::shared::SharedMesh;
use crate::runtime::shutdown::ShutdownSignal;

/// Drives one mesh update pass per period until shutdown.
pub struct MeshScheduler {
    mesh: Arc<SharedMesh>,
    interval: Duration,
}

impl MeshScheduler {
    pub fn new(mesh: Arc<SharedMesh>, interval: Duration) -> Self {
        Self { mesh, interval }
    }

    /// Run passes until `shutdown` fires. Returns the last published pass count.
    pub fn run(&self, shutdown: &ShutdownSignal) -> u64 {
        log::info!("Mesh scheduler started, one pass every {:?}", self.interval);
        let mut passes = self.mesh.passes();

        while !shutdown.is_triggered() {
            match catch_unwind(AssertUnwindSafe(|| self.mesh.advance())) {
                Ok(n) => {
                    passes = n;
                    log::debug!("Mesh pass {} published", n);
                }
                Err(_) => {
                    log::error!("Mesh update pass panicked, keeping previous state");
                }
            }

            if shutdown.wait_timeout(self.interval) {
                break;
            }
        }

        log::info!("Mesh scheduler stopped after {} passes", passes);
        passes
    }
}
