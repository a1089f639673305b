//! Synchronization boundary between the background loops and readers.
//!
//! Each shared group sits behind one mutex that is held only while a value
//! is copied in or out. Update passes are computed on a private copy and
//! published whole, so a reader sees either the previous pass or the new
//! one, never a mix.

use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::MeshResult;
use crate::simulation::{Damper, Grid, Mesh, OscillatorState, Resonator};

/// Point-in-time copy of both mesh layers and the resonator parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    pub grid_a: Grid,
    pub grid_b: Grid,
    pub resonator: Resonator,
    /// Completed update passes when this state was published
    pub passes: u64,
    pub updated_at: SystemTime,
}

impl MeshSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Point-in-time copy of the oscillator state
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSnapshot {
    #[serde(flatten)]
    pub state: OscillatorState,
    /// Integration steps completed when this state was published
    pub step: u64,
    /// The integrator reached its total simulation time
    pub finished: bool,
    pub updated_at: SystemTime,
}

impl OscillatorSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug)]
struct MeshState {
    mesh: Mesh,
    resonator: Resonator,
    damper: Damper,
    passes: u64,
    updated_at: SystemTime,
}

/// Live mesh pair plus operator parameters
#[derive(Debug)]
pub struct SharedMesh {
    state: Mutex<MeshState>,
    /// Serializes whole passes; readers only ever take `state`
    updater: Mutex<()>,
}

impl SharedMesh {
    pub fn new(mesh: Mesh, resonator: Resonator, damper: Damper) -> Self {
        Self {
            state: Mutex::new(MeshState {
                mesh,
                resonator,
                damper,
                passes: 0,
                updated_at: SystemTime::now(),
            }),
            updater: Mutex::new(()),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> MeshResult<Self> {
        let mesh = Mesh::from_config(&config.mesh)?;
        let resonator = Resonator::from_config(&config.resonator)?;
        let damper = Damper::new(config.resonator.damping)?;
        Ok(Self::new(mesh, resonator, damper))
    }

    // Every critical section leaves the state whole, so a poisoned lock
    // still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, MeshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the most recently completed pass
    pub fn read_mesh(&self) -> MeshSnapshot {
        let state = self.lock();
        MeshSnapshot {
            grid_a: state.mesh.grid_a().clone(),
            grid_b: state.mesh.grid_b().clone(),
            resonator: state.resonator,
            passes: state.passes,
            updated_at: state.updated_at,
        }
    }

    pub fn resonator(&self) -> Resonator {
        self.lock().resonator
    }

    pub fn damper(&self) -> Damper {
        self.lock().damper
    }

    pub fn passes(&self) -> u64 {
        self.lock().passes
    }

    /// Replace T and R. Takes effect on the next pass; on error nothing changes.
    pub fn adjust_coefficients(&self, transmission: f64, reflection: f64) -> MeshResult<Resonator> {
        let mut state = self.lock();
        if let Err(e) = state.resonator.set_coefficients(transmission, reflection) {
            log::warn!("Rejected coefficient adjustment: {}", e);
            return Err(e);
        }
        log::info!(
            "Resonator coefficients set to T={} R={}",
            transmission,
            reflection
        );
        Ok(state.resonator)
    }

    /// Replace lambda. Takes effect on the next pass; on error nothing changes.
    pub fn set_wavelength(&self, lambda: f64) -> MeshResult<Resonator> {
        let mut state = self.lock();
        if let Err(e) = state.resonator.set_wavelength(lambda) {
            log::warn!("Rejected wavelength adjustment: {}", e);
            return Err(e);
        }
        log::info!("Resonator wavelength set to {} nm", lambda);
        Ok(state.resonator)
    }

    /// Run one update pass and publish it. Returns the new pass count.
    ///
    /// The state lock is released while the pass is computed on a private
    /// copy. Concurrent callers queue on the updater lock, so every counted
    /// pass is applied to the grids.
    pub fn advance(&self) -> u64 {
        let _updating = self.updater.lock().unwrap_or_else(|e| e.into_inner());
        let (mut mesh, resonator, damper) = {
            let state = self.lock();
            (state.mesh.clone(), state.resonator, state.damper)
        };

        mesh.update(&resonator, &damper);

        let mut state = self.lock();
        state.mesh = mesh;
        state.passes += 1;
        state.updated_at = SystemTime::now();
        state.passes
    }
}

/// Live oscillator state as last published by the integrator
#[derive(Debug)]
pub struct SharedOscillator {
    snapshot: Mutex<OscillatorSnapshot>,
}

impl SharedOscillator {
    pub fn new(initial: OscillatorState) -> Self {
        Self {
            snapshot: Mutex::new(OscillatorSnapshot {
                state: initial,
                step: 0,
                finished: false,
                updated_at: SystemTime::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, OscillatorSnapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn read_oscillator(&self) -> OscillatorSnapshot {
        *self.lock()
    }

    /// Overwrite the published state in one piece
    pub fn publish(&self, state: OscillatorState, step: u64, finished: bool) {
        *self.lock() = OscillatorSnapshot {
            state,
            step,
            finished,
            updated_at: SystemTime::now(),
        };
    }
}
