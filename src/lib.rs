//! Coupled mesh/oscillator simulation with thread-safe state snapshots.
//!
//! Two same-sized grids exchange energy through a wavelength-modulated
//! resonator and a damper, one pass per period. Independently, an RK4
//! integrator advances an extended Van der Pol oscillator. Both states are
//! published through [`runtime::SharedMesh`] and [`runtime::SharedOscillator`]
//! for concurrent readers, and a feedback monitor flags critical cells.

pub mod app;
pub mod config;
pub mod error;
pub mod runtime;
pub mod simulation;

pub use app::App;
pub use config::SimulationConfig;
pub use error::{FetchError, MeshError, MeshResult};
