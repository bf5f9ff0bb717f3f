//! Common error types for Shiftboard

use thiserror::Error;

/// Common result type for Shiftboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the schedule core
///
/// Parsing anomalies in stored documents or form submissions never show up
/// here; they degrade to empty values instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error while persisting a document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (store id, period)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller is not allowed to write schedules
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}
