use std::sync::Arc;
use std::time::Duration;

use crate::config::OscillatorConfig;
use crate::error::{MeshError, MeshResult};
use crate::runtime::shared::SharedOscillator;
use crate::runtime::shutdown::ShutdownSignal;
use crate::simulation::{Integrator, OscillatorState};

/// Runs the oscillator integrator to its total simulation time, publishing
/// every `publish_every` steps.
pub struct OscillatorRunner {
    integrator: Integrator,
    shared: Arc<SharedOscillator>,
    total_time: f64,
    publish_every: u64,
    pacing: Duration,
}

impl OscillatorRunner {
    pub fn new(shared: Arc<SharedOscillator>, config: &OscillatorConfig) -> MeshResult<Self> {
        if config.publish_every == 0 {
            return Err(MeshError::InvalidOscillator(
                "publish_every must be >= 1".into(),
            ));
        }
        Ok(Self {
            integrator: Integrator::from_config(config)?,
            shared,
            total_time: config.total_time,
            publish_every: config.publish_every,
            pacing: config.step_pacing(),
        })
    }

    /// Integrate until the total time is reached or shutdown fires.
    ///
    /// The final state is always published; `finished` tells whether the run
    /// reached its total time.
    pub fn run(mut self, shutdown: &ShutdownSignal) -> OscillatorState {
        log::info!(
            "Oscillator started: dt={} total_time={} publish_every={}",
            self.integrator.dt(),
            self.total_time,
            self.publish_every
        );

        while self.integrator.is_running(self.total_time) {
            if shutdown.is_triggered() {
                break;
            }

            let state = self.integrator.step();
            let step = self.integrator.steps();
            if step % self.publish_every == 0 {
                self.shared.publish(state, step, false);
                log::debug!(
                    "t={:.2} | x={:.3} | y={:.3} | z={:.3} | phase={:.3} | z_error={:.3}",
                    state.t,
                    state.x,
                    state.y,
                    state.z,
                    state.phase,
                    state.z_error
                );
            }

            if !self.pacing.is_zero() && shutdown.wait_timeout(self.pacing) {
                break;
            }
        }

        let finished = !self.integrator.is_running(self.total_time);
        let state = self.integrator.state();
        self.shared.publish(state, self.integrator.steps(), finished);

        if finished {
            log::info!(
                "Oscillator completed {} steps at t={:.2}",
                self.integrator.steps(),
                state.t
            );
        } else {
            log::info!("Oscillator stopped early at t={:.2}", state.t);
        }
        state
    }
}
