//! Error types for pipeline runs.

use std::path::PathBuf;

use pbf_export::ExportError;
use pbf_hatch::HatchError;
use pbf_mesh::MeshError;
use pbf_slicer::SlicerError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can end a pipeline run or job.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The run was cancelled; no result is published.
    #[error("operation cancelled")]
    Cancelled,

    /// A newer job for the same model and operation replaced this one.
    #[error("operation superseded by a newer request")]
    Superseded,

    /// Background task failed to complete.
    #[error("background job failed: {0}")]
    JobFailed(String),

    /// Mesh file could not be read.
    #[error("failed to read mesh {path}: {source}")]
    MeshRead {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Mesh file is not a valid hand-off document.
    #[error("failed to parse mesh {path}: {source}")]
    MeshFormat {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Mesh validation failed.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Slicing failed.
    #[error(transparent)]
    Slice(#[from] SlicerError),

    /// Hatching failed.
    #[error(transparent)]
    Hatch(#[from] HatchError),

    /// Export failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
