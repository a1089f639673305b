use crate::config::MeshConfig;
use crate::error::{MeshError, MeshResult};
use crate::simulation::grid::Grid;
use crate::simulation::operators::{Damper, Resonator};

/// Pair of same-sized layers: A transmits, B receives.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    source: Grid,
    target: Grid,
}

impl Mesh {
    /// Pair two grids. Fails unless both have the same dimensions.
    pub fn new(source: Grid, target: Grid) -> MeshResult<Self> {
        if source.dims() != target.dims() {
            return Err(MeshError::DimensionMismatch {
                a_rows: source.rows(),
                a_cols: source.cols(),
                b_rows: target.rows(),
                b_cols: target.cols(),
            });
        }
        Ok(Self { source, target })
    }

    pub fn from_config(config: &MeshConfig) -> MeshResult<Self> {
        let source = Grid::source_layer(config.rows, config.cols, config.initial_field)?;
        let target = Grid::new(config.rows, config.cols)?;
        Self::new(source, target)
    }

    pub fn grid_a(&self) -> &Grid {
        &self.source
    }

    pub fn grid_b(&self) -> &Grid {
        &self.target
    }

    pub fn dims(&self) -> (usize, usize) {
        self.source.dims()
    }

    /// One full update pass.
    ///
    /// Transmission runs over every `(A[i][j], B[i][j])` pair in row-major
    /// order before stabilization runs over B. Each B cell receives from
    /// exactly one A cell.
    pub fn update(&mut self, resonator: &Resonator, damper: &Damper) {
        for (a, b) in self.source.iter_mut().zip(self.target.iter_mut()) {
            resonator.transmit(a, b);
        }
        for b in self.target.iter_mut() {
            damper.stabilize(b);
        }
    }
}
