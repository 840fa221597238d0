//! Model-to-world transform pipeline.
//!
//! World space is Y-up: the build surface is the X/Z plane at
//! `build_surface_y`, and slicing planes are horizontal in Y. The pipeline is
//!
//! 1. center the model on X/Z and rest its lowest point on the build surface,
//! 2. scale about the geometric center,
//! 3. rotate about the geometric center (`Rz * Ry * Rx`, X applied first),
//! 4. translate by the user position.
//!
//! [`ModelTransform::world_matrix`] and [`transform_vertex`] express the same
//! sequence; renderers should use the matrix, the slicer uses [`WorldMesh`],
//! which is built from the matrix.

use pbf_math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::{Aabb, Mesh, MeshError};

/// Live placement of a model, edited by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTransform {
    /// Translation in mm.
    pub position: [f64; 3],
    /// Rotation about X, Y, Z in degrees.
    pub rotation: [f64; 3],
    /// Per-axis scale factor.
    pub scale: [f64; 3],
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl ModelTransform {
    /// Pivot for scale and rotation after the model has been placed.
    fn pivot(bounds: &Aabb, build_surface_y: f64) -> Vec3 {
        Vec3::new(0.0, build_surface_y + bounds.size()[1] / 2.0, 0.0)
    }

    /// Composed model-to-world matrix for a model with the given bounds.
    pub fn world_matrix(&self, bounds: &Aabb, build_surface_y: f64) -> Transform {
        let center = bounds.center();
        let place = Transform::translation(-center.x, build_surface_y - bounds.min[1], -center.z);

        let p = Self::pivot(bounds, build_surface_y);
        let to_pivot = Transform::translation(p.x, p.y, p.z);
        let from_pivot = Transform::translation(-p.x, -p.y, -p.z);

        let scale = to_pivot
            .then(&Transform::scale(self.scale[0], self.scale[1], self.scale[2]))
            .then(&from_pivot);
        let rotate = to_pivot
            .then(&Transform::rotation_xyz_degrees(
                self.rotation[0],
                self.rotation[1],
                self.rotation[2],
            ))
            .then(&from_pivot);
        let position = Transform::translation(self.position[0], self.position[1], self.position[2]);

        position.then(&rotate).then(&scale).then(&place)
    }
}

/// Map one model-space vertex to world space.
pub fn transform_vertex(
    vertex: &Point3,
    transform: &ModelTransform,
    bounds: &Aabb,
    build_surface_y: f64,
) -> Point3 {
    let center = bounds.center();
    let pivot = ModelTransform::pivot(bounds, build_surface_y);

    // 1. place on the build surface
    let placed = Vec3::new(
        vertex.x - center.x,
        vertex.y - bounds.min[1] + build_surface_y,
        vertex.z - center.z,
    );

    // 2. scale about the pivot
    let mut v = placed - pivot;
    v.x *= transform.scale[0];
    v.y *= transform.scale[1];
    v.z *= transform.scale[2];

    // 3. rotate about the pivot, X then Y then Z
    let [rx, ry, rz] = transform.rotation.map(f64::to_radians);
    let (s, c) = rx.sin_cos();
    v = Vec3::new(v.x, v.y * c - v.z * s, v.y * s + v.z * c);
    let (s, c) = ry.sin_cos();
    v = Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c);
    let (s, c) = rz.sin_cos();
    v = Vec3::new(v.x * c - v.y * s, v.x * s + v.y * c, v.z);

    // 4. user position
    let world = v + pivot + Vec3::from(transform.position);
    Point3::from(world)
}

/// A mesh snapshot in world coordinates.
#[derive(Debug, Clone)]
pub struct WorldMesh {
    /// Transformed vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle indices, shared with the source mesh.
    pub indices: Vec<u32>,
    /// World-space bounds of the transformed vertices.
    pub bounds: Aabb,
}

impl WorldMesh {
    /// Validate `mesh` and transform every vertex into world space.
    pub fn from_mesh(
        mesh: &Mesh,
        transform: &ModelTransform,
        build_surface_y: f64,
    ) -> Result<Self, MeshError> {
        mesh.validate()?;
        let model_bounds = mesh.bounds().ok_or(MeshError::Empty)?;
        let matrix = transform.world_matrix(&model_bounds, build_surface_y);

        let mut bounds = Aabb::empty();
        let vertices: Vec<Point3> = (0..mesh.num_vertices())
            .map(|i| {
                let p = matrix.apply_point(&mesh.vertex(i));
                bounds.include(&p);
                p
            })
            .collect();

        Ok(Self {
            vertices,
            indices: mesh.indices.clone(),
            bounds,
        })
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// The three corners of triangle `t`.
    pub fn triangle(&self, t: usize) -> [Point3; 3] {
        [
            self.vertices[self.indices[t * 3] as usize],
            self.vertices[self.indices[t * 3 + 1] as usize],
            self.vertices[self.indices[t * 3 + 2] as usize],
        ]
    }

    /// Height of the model along the up axis.
    pub fn height(&self) -> f64 {
        self.bounds.max[1] - self.bounds.min[1]
    }
}
