//! Crate-wide error types.
//!
//! All fallible operations return [`Result`] with [`NowcastError`]. Validation
//! errors are raised eagerly, before any transform or solve work starts.

use std::fmt;

pub type Result<T> = std::result::Result<T, NowcastError>;

/// Errors produced by the cascade and autoregression engines.
#[derive(Debug)]
pub enum NowcastError {
    /// Shape, domain or flag-combination mismatch detected during validation.
    InvalidArgument(String),
    /// An input field contains NaN or infinite values.
    NonFiniteInput(String),
    /// Recomposition was attempted on a decomposition without statistics.
    MissingStatistics,
    /// A Yule-Walker fit produced an unstable characteristic polynomial.
    NonStationaryProcess,
    Io(std::io::Error),
}

impl fmt::Display for NowcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NowcastError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            NowcastError::NonFiniteInput(msg) => write!(f, "non-finite input: {}", msg),
            NowcastError::MissingStatistics => {
                write!(f, "the decomposition was done without compute_stats")
            }
            NowcastError::NonStationaryProcess => {
                write!(f, "nonstationary AR(p) process")
            }
            NowcastError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for NowcastError {}

impl From<std::io::Error> for NowcastError {
    fn from(value: std::io::Error) -> Self {
        NowcastError::Io(value)
    }
}
