//! LArPix provider error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for LArPix provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// LArPix provider error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A configured file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured file is not valid JSON for its schema.
    #[error("malformed JSON in {}: {source}", path.display())]
    MalformedFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Geometry description is inconsistent.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] pixcal_core::Error),
}
