use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{InitialField, INITIAL_AMPLITUDE, Q_GRADIENT};
use crate::error::{MeshError, MeshResult};
use crate::simulation::cell::Cell;

/// Rectangular layer of cells stored row-major.
///
/// Cell (x, y) lives at row `y`, column `x`. Coordinates are assigned by the
/// grid itself, so they are unique and match the storage position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Grid {
    cells: Vec<Cell>,
    rows: usize,
    cols: usize,
}

impl Grid {
    /// Create a grid of cells at rest
    pub fn new(rows: usize, cols: usize) -> MeshResult<Self> {
        Self::populated(rows, cols, |_, _| (0.0, 0.0))
    }

    /// Create a grid whose cell (x, y) gets the `(amplitude, q)` returned by `init`
    pub fn populated<F>(rows: usize, cols: usize, mut init: F) -> MeshResult<Self>
    where
        F: FnMut(u32, u32) -> (f64, f64),
    {
        if rows == 0 || cols == 0 {
            return Err(MeshError::InvalidDimensions { rows, cols });
        }
        if u32::try_from(rows).is_err() || u32::try_from(cols).is_err() {
            return Err(MeshError::Config(format!(
                "grid {}x{} exceeds u32 coordinates",
                rows, cols
            )));
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for y in 0..rows as u32 {
            for x in 0..cols as u32 {
                let (amplitude, q) = init(x, y);
                cells.push(Cell::with_state(x, y, amplitude, 0.0, q));
            }
        }

        Ok(Self { cells, rows, cols })
    }

    /// Source layer with the given initial field
    pub fn source_layer(rows: usize, cols: usize, field: InitialField) -> MeshResult<Self> {
        match field {
            InitialField::Gradient => Self::populated(rows, cols, |x, y| {
                (INITIAL_AMPLITUDE, Q_GRADIENT * f64::from(x + y))
            }),
            InitialField::Random { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                Self::populated(rows, cols, |_, _| {
                    (rng.gen_range(0.5..1.5), rng.gen_range(-0.5..0.5))
                })
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }

    /// Overwrite one cell's amplitude. Returns false when out of bounds.
    pub fn set_amplitude(&mut self, row: usize, col: usize, amplitude: f64) -> bool {
        match self.get_mut(row, col) {
            Some(cell) => {
                cell.amplitude = amplitude;
                true
            }
            None => false,
        }
    }

    /// Cells in row-major order
    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Cell> {
        self.cells.iter_mut()
    }

    /// Rows in order, each ordered by column
    pub fn row_slices(&self) -> std::slice::Chunks<'_, Cell> {
        self.cells.chunks(self.cols)
    }

    /// Raw row-major cell buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    pub fn mean_amplitude(&self) -> f64 {
        let sum: f64 = self.cells.iter().map(|c| c.amplitude).sum();
        sum / self.cells.len() as f64
    }
}

impl From<Grid> for Vec<Vec<Cell>> {
    fn from(grid: Grid) -> Self {
        grid.row_slices().map(|row| row.to_vec()).collect()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Grid {
    type Error = MeshError;

    fn try_from(rows: Vec<Vec<Cell>>) -> MeshResult<Self> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if row_count == 0 || cols == 0 {
            return Err(MeshError::InvalidDimensions {
                rows: row_count,
                cols,
            });
        }

        let mut cells = Vec::with_capacity(row_count * cols);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(MeshError::Config(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    cols
                )));
            }
            for (x, cell) in row.into_iter().enumerate() {
                if cell.coords() != (x as u32, y as u32) {
                    return Err(MeshError::Config(format!(
                        "cell at row {} column {} carries coordinates {:?}",
                        y,
                        x,
                        cell.coords()
                    )));
                }
                cells.push(cell);
            }
        }

        Ok(Self {
            cells,
            rows: row_count,
            cols,
        })
    }
}
