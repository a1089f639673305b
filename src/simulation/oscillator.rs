//! Extended Van der Pol oscillator with an adaptive coupling variable.
//!
//! ```text
//! mu(z) = mu0 + k * z
//! dx/dt = y
//! dy/dt = mu(z) * (1 - x^2) * y - x
//! dz/dt = -alpha * (z - z_target) + beta * (|x| + |y| - threshold)
//! ```
//!
//! Integrated with classic fixed-step RK4. `phase` and `z_error` are derived
//! from the state after every step, never integrated.

use serde::{Deserialize, Serialize};

use crate::config::OscillatorConfig;
use crate::error::{MeshError, MeshResult};

/// Phase-space point `[x, y, z]`
pub type PhasePoint = [f64; 3];

/// Initial condition at process start
pub const INITIAL_POINT: PhasePoint = [1.0, 0.0, 0.5];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorParams {
    pub mu0: f64,
    pub k: f64,
    pub alpha: f64,
    pub beta: f64,
    pub threshold: f64,
    pub z_target: f64,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self::from_config(&OscillatorConfig::default())
    }
}

impl OscillatorParams {
    pub fn from_config(config: &OscillatorConfig) -> Self {
        Self {
            mu0: config.mu0,
            k: config.mu_z_gain,
            alpha: config.alpha,
            beta: config.beta,
            threshold: config.threshold,
            z_target: config.z_target,
        }
    }

    pub fn validate(&self) -> MeshResult<()> {
        let all = [
            self.mu0,
            self.k,
            self.alpha,
            self.beta,
            self.threshold,
            self.z_target,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(MeshError::InvalidOscillator(format!(
                "non-finite parameter in {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Feedback-modulated damping coefficient
    pub fn mu(&self, z: f64) -> f64 {
        self.mu0 + self.k * z
    }

    /// Right-hand side of the system. The system is autonomous; `_t` is kept
    /// so the stepper evaluates at the usual RK4 abscissae.
    pub fn derivatives(&self, _t: f64, p: &PhasePoint) -> PhasePoint {
        let [x, y, z] = *p;
        let dx = y;
        let dy = self.mu(z) * (1.0 - x * x) * y - x;
        let dz = -self.alpha * (z - self.z_target) + self.beta * (x.abs() + y.abs() - self.threshold);
        [dx, dy, dz]
    }

    /// One RK4 step of size `dt` from `p` at time `t`
    pub fn rk4_step(&self, t: f64, p: &PhasePoint, dt: f64) -> PhasePoint {
        let k1 = self.derivatives(t, p);
        let p2 = offset(p, &k1, dt / 2.0);
        let k2 = self.derivatives(t + dt / 2.0, &p2);
        let p3 = offset(p, &k2, dt / 2.0);
        let k3 = self.derivatives(t + dt / 2.0, &p3);
        let p4 = offset(p, &k3, dt);
        let k4 = self.derivatives(t + dt, &p4);

        std::array::from_fn(|i| p[i] + (dt / 6.0) * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
    }
}

/// `p + k * h`, component-wise
fn offset(p: &PhasePoint, k: &PhasePoint, h: f64) -> PhasePoint {
    [p[0] + k[0] * h, p[1] + k[1] * h, p[2] + k[2] * h]
}

/// Observable oscillator state with its derived indicators
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorState {
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub phase: f64,
    pub z_error: f64,
}

impl OscillatorState {
    pub fn from_point(t: f64, p: &PhasePoint, z_target: f64) -> Self {
        let [x, y, z] = *p;
        Self {
            t,
            x,
            y,
            z,
            phase: y.atan2(x),
            z_error: (z - z_target).abs(),
        }
    }

    pub fn initial(z_target: f64) -> Self {
        Self::from_point(0.0, &INITIAL_POINT, z_target)
    }

    pub fn point(&self) -> PhasePoint {
        [self.x, self.y, self.z]
    }
}

/// Fixed-step integrator owning the live phase-space point.
#[derive(Clone, Debug)]
pub struct Integrator {
    params: OscillatorParams,
    dt: f64,
    t: f64,
    point: PhasePoint,
    steps: u64,
}

impl Integrator {
    pub fn new(params: OscillatorParams, dt: f64) -> MeshResult<Self> {
        params.validate()?;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(MeshError::InvalidOscillator(format!(
                "dt must be finite and > 0, got {}",
                dt
            )));
        }
        Ok(Self {
            params,
            dt,
            t: 0.0,
            point: INITIAL_POINT,
            steps: 0,
        })
    }

    pub fn from_config(config: &OscillatorConfig) -> MeshResult<Self> {
        Self::new(OscillatorParams::from_config(config), config.dt)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn state(&self) -> OscillatorState {
        OscillatorState::from_point(self.t, &self.point, self.params.z_target)
    }

    /// Advance one step and return the new state
    pub fn step(&mut self) -> OscillatorState {
        self.point = self.params.rk4_step(self.t, &self.point, self.dt);
        self.t += self.dt;
        self.steps += 1;
        self.state()
    }

    /// Whether another step would still start before `total_time`
    pub fn is_running(&self, total_time: f64) -> bool {
        self.t < total_time
    }
}
