mod cell;
mod grid;
mod mesh;
mod operators;
mod oscillator;

pub use cell::Cell;
pub use grid::Grid;
pub use mesh::Mesh;
pub use operators::{Damper, Resonator, WaveType};
pub use oscillator::{Integrator, OscillatorParams, OscillatorState, PhasePoint, INITIAL_POINT};
