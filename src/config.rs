use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::simulation::WaveType;

/// Mesh dimensions (5x5 cells per layer)
pub const MESH_ROWS: usize = 5;
pub const MESH_COLS: usize = 5;

/// Period between two mesh update passes
pub const MESH_UPDATE_INTERVAL_MS: u64 = 5_000;

// ============================================
// Resonator (transmission) Parameters
// ============================================

/// Transmission coefficient T
pub const TRANSMISSION_COEF: f64 = 0.6;

/// Reflection/retention coefficient R (T + R must equal 1)
pub const REFLECTION_COEF: f64 = 0.4;

/// Default photon wavelength in nanometers
pub const LAMBDA_NM: f64 = 600.0;

/// Reference wavelength the transmission factor is normalized against
pub const REFERENCE_WAVELENGTH_NM: f64 = 500.0;

/// Allowed deviation of T + R from 1
pub const COEF_SUM_TOLERANCE: f64 = 1e-6;

/// Fraction of amplitude removed by the damper per application
pub const DAMPING_COEF: f64 = 0.3;

/// Initial amplitude of every Grid A cell
pub const INITIAL_AMPLITUDE: f64 = 1.0;

/// Scalar field gradient: q = Q_GRADIENT * (x + y)
pub const Q_GRADIENT: f64 = 0.1;

// ============================================
// Extended Oscillator Parameters
// ============================================

/// Base value of the damping term mu
pub const MU0: f64 = 2.0;

/// Sensitivity of mu to the adaptive variable z
pub const MU_Z_GAIN: f64 = 0.5;

/// Return rate of z towards its target
pub const ALPHA: f64 = 1.0;

/// Correction gain on z
pub const BETA: f64 = 0.1;

/// |x| + |y| level above which z is pushed up
pub const CORRECTION_THRESHOLD: f64 = 1.0;

/// Target value for z
pub const Z_TARGET: f64 = 0.0;

/// Integration step
pub const OSCILLATOR_DT: f64 = 0.01;

/// Total simulated time before the integrator halts
pub const OSCILLATOR_TOTAL_TIME: f64 = 30.0;

/// Publish the oscillator state every N integration steps
pub const OSCILLATOR_PUBLISH_EVERY: u64 = 10;

// ============================================
// Feedback Monitor
// ============================================

/// Period between two monitor cycles
pub const MONITOR_INTERVAL_MS: u64 = 10_000;

/// Amplitude above which a Grid A cell is critical
pub const CRITICAL_AMPLITUDE: f64 = 1.5;

/// Upper bound on a single mesh fetch
pub const FETCH_TIMEOUT_MS: u64 = 5_000;

/// How Grid A is populated at construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InitialField {
    /// amplitude = INITIAL_AMPLITUDE, q = Q_GRADIENT * (x + y)
    #[default]
    Gradient,
    /// Reproducible random amplitudes and q values
    Random { seed: u64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub rows: usize,
    pub cols: usize,
    pub update_interval_ms: u64,
    pub initial_field: InitialField,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            rows: MESH_ROWS,
            cols: MESH_COLS,
            update_interval_ms: MESH_UPDATE_INTERVAL_MS,
            initial_field: InitialField::Gradient,
        }
    }
}

impl MeshConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonatorConfig {
    pub transmission: f64,
    pub reflection: f64,
    pub lambda_nm: f64,
    pub wave_type: WaveType,
    pub damping: f64,
}

impl Default for ResonatorConfig {
    fn default() -> Self {
        Self {
            transmission: TRANSMISSION_COEF,
            reflection: REFLECTION_COEF,
            lambda_nm: LAMBDA_NM,
            wave_type: WaveType::default(),
            damping: DAMPING_COEF,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorConfig {
    pub mu0: f64,
    pub mu_z_gain: f64,
    pub alpha: f64,
    pub beta: f64,
    pub threshold: f64,
    pub z_target: f64,
    pub dt: f64,
    pub total_time: f64,
    pub publish_every: u64,
    /// Wall-clock sleep after each step; 0 runs as fast as possible
    pub step_pacing_ms: u64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            mu0: MU0,
            mu_z_gain: MU_Z_GAIN,
            alpha: ALPHA,
            beta: BETA,
            threshold: CORRECTION_THRESHOLD,
            z_target: Z_TARGET,
            dt: OSCILLATOR_DT,
            total_time: OSCILLATOR_TOTAL_TIME,
            publish_every: OSCILLATOR_PUBLISH_EVERY,
            step_pacing_ms: (OSCILLATOR_DT * 1000.0) as u64,
        }
    }
}

impl OscillatorConfig {
    pub fn step_pacing(&self) -> Duration {
        Duration::from_millis(self.step_pacing_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_ms: u64,
    pub critical_amplitude: f64,
    /// Mean Grid A amplitude that triggers a corrective alert
    pub mean_amplitude_limit: f64,
    pub fetch_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: MONITOR_INTERVAL_MS,
            critical_amplitude: CRITICAL_AMPLITUDE,
            mean_amplitude_limit: CRITICAL_AMPLITUDE,
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Runtime configuration for the whole simulation.
///
/// `Default` yields the reference parameters above. Every section may be
/// omitted when deserializing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mesh: MeshConfig,
    pub resonator: ResonatorConfig,
    pub oscillator: OscillatorConfig,
    pub monitor: MonitorConfig,
}

impl SimulationConfig {
    /// Validate the parameters that the component constructors do not
    /// already check (periods, integration step, thresholds).
    pub fn validate(&self) -> MeshResult<()> {
        if self.mesh.rows == 0 || self.mesh.cols == 0 {
            return Err(MeshError::InvalidDimensions {
                rows: self.mesh.rows,
                cols: self.mesh.cols,
            });
        }
        if self.mesh.update_interval_ms == 0 {
            return Err(MeshError::Config(
                "mesh.update_interval_ms must be > 0".into(),
            ));
        }
        if self.monitor.interval_ms == 0 {
            return Err(MeshError::Config("monitor.interval_ms must be > 0".into()));
        }
        if self.monitor.fetch_timeout_ms == 0 {
            return Err(MeshError::Config(
                "monitor.fetch_timeout_ms must be > 0".into(),
            ));
        }
        if !self.monitor.critical_amplitude.is_finite()
            || !self.monitor.mean_amplitude_limit.is_finite()
        {
            return Err(MeshError::Config(format!(
                "monitor thresholds must be finite, got {} / {}",
                self.monitor.critical_amplitude, self.monitor.mean_amplitude_limit
            )));
        }
        let osc = &self.oscillator;
        if !(osc.dt.is_finite() && osc.dt > 0.0) {
            return Err(MeshError::InvalidOscillator(format!(
                "dt must be finite and > 0, got {}",
                osc.dt
            )));
        }
        if !(osc.total_time.is_finite() && osc.total_time >= 0.0) {
            return Err(MeshError::InvalidOscillator(format!(
                "total_time must be finite and >= 0, got {}",
                osc.total_time
            )));
        }
        if osc.publish_every == 0 {
            return Err(MeshError::InvalidOscillator(
                "publish_every must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
