use serde::{Deserialize, Serialize};

/// One spatial point of a mesh layer.
///
/// Layout: 32 bytes total, row-major buffers of cells can be handed to a
/// transport as raw bytes.
/// - x, y: u32 = 8 bytes - Column and row index, fixed at construction
/// - amplitude: f64 = 8 bytes - Energy/signal carried by the cell (any sign)
/// - phase: f64 = 8 bytes - Radians, carried but not evolved yet
/// - q: f64 = 8 bytes - Scalar field modulating transmission, fixed at construction
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Cell {
    x: u32,
    y: u32,

    /// Primary energy quantity, mutated by the transmission and damping operators
    pub amplitude: f64,

    /// Phase angle in radians
    pub phase: f64,

    q: f64,
}

impl Cell {
    /// Create a cell at rest (zero amplitude, phase and field)
    pub fn new(x: u32, y: u32) -> Self {
        Self::with_state(x, y, 0.0, 0.0, 0.0)
    }

    /// Create a cell with explicit amplitude, phase and scalar field
    pub fn with_state(x: u32, y: u32, amplitude: f64, phase: f64, q: f64) -> Self {
        Self {
            x,
            y,
            amplitude,
            phase,
            q,
        }
    }

    pub fn coords(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    /// Scalar field value, immutable for the lifetime of the cell
    pub fn q(&self) -> f64 {
        self.q
    }
}
