//! Hit-building error types.

use thiserror::Error;

/// Result type for hit-building operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Hit-building error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Calibration or geometry provider error.
    #[error("provider error: {0}")]
    Provider(#[from] pixcal_larpix::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] pixcal_core::Error),
}
