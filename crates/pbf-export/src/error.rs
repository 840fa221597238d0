//! Error types for export.

use thiserror::Error;

/// Errors that can occur while writing layer records.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Export parameters are unusable.
    #[error("invalid export settings: {0}")]
    InvalidSettings(String),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
