use std::time::Duration;

use thiserror::Error;

/// Configuration and lifecycle failures.
///
/// All of these are raised at construction or adjustment time; none is
/// produced from inside a running update pass.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("invalid grid dimensions {rows}x{cols}: both must be >= 1")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("grid dimensions differ: A is {a_rows}x{a_cols}, B is {b_rows}x{b_cols}")]
    DimensionMismatch {
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },

    #[error("coefficients must satisfy T + R = 1, got T={t} R={r} (sum {})", .t + .r)]
    CoefficientSum { t: f64, r: f64 },

    #[error("wavelength must be finite and > 0 nm, got {0}")]
    InvalidWavelength(f64),

    #[error("damping coefficient must be within [0, 1], got {0}")]
    InvalidDamping(f64),

    #[error("invalid oscillator parameters: {0}")]
    InvalidOscillator(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// Failure to obtain a mesh snapshot for one monitor cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("mesh fetch exceeded {0:?}")]
    Timeout(Duration),

    #[error("mesh source unavailable: {0}")]
    Unavailable(String),

    #[error("mesh source worker disconnected")]
    Disconnected,
}
