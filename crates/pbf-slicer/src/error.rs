//! Error types for the slicer.

use pbf_mesh::MeshError;
use thiserror::Error;

/// Errors that can occur during slicing.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Mesh failed validation.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Invalid slice settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
