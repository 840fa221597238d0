#![warn(missing_docs)]

//! Triangle mesh hand-off for the pbf scan-path core.
//!
//! The mesh-loading collaborator (STEP/IGES tessellation) produces a flat
//! vertex/index buffer plus an axis-aligned bounding box. This crate owns that
//! hand-off type and the pure model-to-world transform that every consumer
//! (slicer and renderer alike) must share.

pub mod transform;

pub use transform::{transform_vertex, ModelTransform, WorldMesh};

use pbf_math::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating a mesh hand-off.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Mesh has no vertices or no triangles.
    #[error("mesh is empty")]
    Empty,

    /// Vertex buffer length is not a multiple of 3.
    #[error("vertex buffer length {0} is not a multiple of 3")]
    RaggedVertices(usize),

    /// Index buffer length is not a multiple of 3.
    #[error("index buffer length {0} is not a multiple of 3")]
    RaggedIndices(usize),

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        /// Triangle number.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner `[x, y, z]`.
    pub min: [f64; 3],
    /// Maximum corner `[x, y, z]`.
    pub max: [f64; 3],
}

impl Aabb {
    /// An inverted box that any point will expand.
    pub fn empty() -> Self {
        Self {
            min: [f64::MAX; 3],
            max: [f64::MIN; 3],
        }
    }

    /// Grow the box to include `p`.
    pub fn include(&mut self, p: &Point3) {
        for (axis, value) in [p.x, p.y, p.z].into_iter().enumerate() {
            self.min[axis] = self.min[axis].min(value);
            self.max[axis] = self.max[axis].max(value);
        }
    }

    /// Box center.
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        )
    }

    /// Extent along each axis.
    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// True if no point was ever included.
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }
}

/// Triangle mesh as delivered by the loading collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]` (u32).
    pub indices: Vec<u32>,
    /// Bounding box supplied by the loader, if any.
    #[serde(default)]
    pub bounds: Option<Aabb>,
}

impl Mesh {
    /// Create a mesh from raw buffers; bounds are computed on demand.
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            bounds: None,
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Vertex `i` as a double-precision point.
    pub fn vertex(&self, i: usize) -> Point3 {
        Point3::new(
            self.vertices[i * 3] as f64,
            self.vertices[i * 3 + 1] as f64,
            self.vertices[i * 3 + 2] as f64,
        )
    }

    /// Check buffer shapes and index ranges.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(MeshError::Empty);
        }
        if self.vertices.len() % 3 != 0 {
            return Err(MeshError::RaggedVertices(self.vertices.len()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::RaggedIndices(self.indices.len()));
        }
        let vertex_count = self.num_vertices();
        if let Some((pos, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, &i)| i as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange {
                triangle: pos / 3,
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    /// Loader-supplied bounds, or bounds computed from the vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        if let Some(bounds) = self.bounds {
            return Some(bounds);
        }
        if self.vertices.len() < 3 {
            return None;
        }
        let mut bounds = Aabb::empty();
        for i in 0..self.num_vertices() {
            bounds.include(&self.vertex(i));
        }
        Some(bounds)
    }

    /// Axis-aligned box mesh spanning `min..max`, outward-facing triangles.
    pub fn cuboid(min: [f32; 3], max: [f32; 3]) -> Self {
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let vertices = vec![
            x0, y0, z0, x1, y0, z0, x1, y0, z1, x0, y0, z1, // bottom (y = y0)
            x0, y1, z0, x1, y1, z0, x1, y1, z1, x0, y1, z1, // top (y = y1)
        ];
        let indices = vec![
            0, 1, 2, 0, 2, 3, // bottom
            4, 6, 5, 4, 7, 6, // top
            0, 4, 5, 0, 5, 1, // z0 side
            3, 2, 6, 3, 6, 7, // z1 side
            0, 3, 7, 0, 7, 4, // x0 side
            1, 5, 6, 1, 6, 2, // x1 side
        ];
        Self::new(vertices, indices)
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
        self.bounds = None;
    }
}
