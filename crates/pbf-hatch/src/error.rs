//! Error types for hatching.

use thiserror::Error;

use crate::strategy::HatchPattern;

/// Errors that can occur during hatch generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HatchError {
    /// No strategy is registered for the requested pattern.
    #[error("no hatching strategy registered for pattern '{0}'")]
    UnknownPattern(HatchPattern),

    /// Pattern name could not be parsed.
    #[error("unknown hatch pattern name '{0}'")]
    UnknownPatternName(String),

    /// Hatching parameters are out of range.
    #[error("invalid hatching parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for hatching operations.
pub type Result<T> = std::result::Result<T, HatchError>;
