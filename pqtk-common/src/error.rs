//! Common error types for PQTK

use thiserror::Error;

/// Common result type for PQTK operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across PQTK crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON text could not be parsed at all
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
