//! Mesh slicing - intersect world triangles with horizontal planes.
//!
//! The up axis is world Y. A plane at height `y` cuts the mesh into segments
//! whose 2D coordinates are `(world x, world z)`.

use std::ops::Range;

use pbf_math::{Point2, Point3};
use pbf_mesh::WorldMesh;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};
use crate::path::Segment;

/// Edges whose end heights differ by less than this are treated as flat.
pub const EDGE_EPS: f64 = 1e-10;

/// Intersection points closer than this are merged.
pub const MERGE_EPS: f64 = 1e-9;

/// Slack when rounding the layer count up.
const COUNT_EPS: f64 = 1e-9;

/// Raw intersection segments of one plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSlice {
    /// Layer index (0 = first layer).
    pub layer_index: usize,
    /// Plane height (world Y, mm).
    pub z_height: f64,
    /// Intersection segments, at most one per triangle.
    pub segments: Vec<Segment>,
    /// Triangles whose intersection produced an invalid point count.
    pub defects: usize,
}

/// Evenly spaced slicing planes over a height range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlan {
    /// Bottom of the sliced range (world Y).
    pub base: f64,
    /// Layer thickness (mm).
    pub thickness: f64,
    /// Number of layers.
    pub count: usize,
}

impl LayerPlan {
    /// Plan layers covering `min_y..max_y`.
    ///
    /// `count = ceil(height / thickness)` and each plane sits at the middle of
    /// its layer.
    pub fn new(min_y: f64, max_y: f64, thickness: f64) -> Result<Self> {
        if !thickness.is_finite() || thickness <= 0.0 {
            return Err(SlicerError::InvalidSettings(format!(
                "layer thickness must be positive, got {thickness}"
            )));
        }
        let height = (max_y - min_y).max(0.0);
        // Rounding noise from the transform must not add a sliver layer.
        let count = (height / thickness - COUNT_EPS).ceil().max(0.0) as usize;
        Ok(Self {
            base: min_y,
            thickness,
            count,
        })
    }

    /// Plan layers covering the world bounds of a mesh.
    pub fn for_mesh(mesh: &WorldMesh, thickness: f64) -> Result<Self> {
        Self::new(mesh.bounds.min[1], mesh.bounds.max[1], thickness)
    }

    /// Plane height of layer `index`.
    pub fn height(&self, index: usize) -> f64 {
        self.base + (index as f64 + 0.5) * self.thickness
    }

    /// All plane heights, bottom to top.
    pub fn heights(&self) -> Vec<f64> {
        (0..self.count).map(|i| self.height(i)).collect()
    }
}

/// World triangles laid out for repeated plane queries.
///
/// Triangles are sorted by their lowest Y so the candidates for a plane are
/// a prefix of the arrays.
#[derive(Debug, Clone, Default)]
pub struct SliceTriangles {
    y_min: Vec<f64>,
    y_max: Vec<f64>,
    corners: Vec<[Point3; 3]>,
}

impl SliceTriangles {
    /// Collect and sort the triangles of a world mesh.
    pub fn new(mesh: &WorldMesh) -> Result<Self> {
        let n = mesh.num_triangles();
        if n == 0 {
            return Err(SlicerError::EmptyMesh);
        }

        let mut order: Vec<(f64, f64, [Point3; 3])> = (0..n)
            .map(|t| {
                let tri = mesh.triangle(t);
                let lo = tri[0].y.min(tri[1].y).min(tri[2].y);
                let hi = tri[0].y.max(tri[1].y).max(tri[2].y);
                (lo, hi, tri)
            })
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut out = Self {
            y_min: Vec::with_capacity(n),
            y_max: Vec::with_capacity(n),
            corners: Vec::with_capacity(n),
        };
        for (lo, hi, tri) in order {
            out.y_min.push(lo);
            out.y_max.push(hi);
            out.corners.push(tri);
        }
        Ok(out)
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    /// True if there are no triangles.
    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Intersect every candidate triangle with the plane at `plane_y`.
    pub fn slice_plane(&self, plane_y: f64, layer_index: usize) -> LayerSlice {
        let active = self.y_min.partition_point(|&lo| lo <= plane_y);

        let mut segments = Vec::new();
        let mut defects = 0;
        for t in 0..active {
            if self.y_max[t] < plane_y {
                continue;
            }
            match triangle_plane_intersection(&self.corners[t], plane_y) {
                Crossing::Segment(seg) => segments.push(seg),
                Crossing::Defect => defects += 1,
                Crossing::None => {}
            }
        }

        if defects > 0 {
            tracing::debug!(layer_index, plane_y, defects, "slice defects");
        }

        LayerSlice {
            layer_index,
            z_height: plane_y,
            segments,
            defects,
        }
    }

    /// Slice a range of planned layers in parallel.
    pub fn slice_range(&self, plan: &LayerPlan, layers: Range<usize>) -> Vec<LayerSlice> {
        layers
            .into_par_iter()
            .map(|i| self.slice_plane(plan.height(i), i))
            .collect()
    }
}

/// Slice a world mesh at every planned layer.
///
/// Returns layers sorted by index from bottom to top.
pub fn slice_mesh(mesh: &WorldMesh, plan: &LayerPlan) -> Result<Vec<LayerSlice>> {
    let triangles = SliceTriangles::new(mesh)?;
    Ok(triangles.slice_range(plan, 0..plan.count))
}

/// Outcome of intersecting one triangle with a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    None,
    Segment(Segment),
    Defect,
}

/// Intersect a triangle with the horizontal plane at `plane_y`.
fn triangle_plane_intersection(tri: &[Point3; 3], plane_y: f64) -> Crossing {
    let mut points: [Point2; 3] = [Point2::origin(); 3];
    let mut raw = 0;
    let mut distinct = 0;

    for k in 0..3 {
        let a = &tri[k];
        let b = &tri[(k + 1) % 3];
        let (ha, hb) = (a.y, b.y);
        if ha.min(hb) > plane_y || ha.max(hb) < plane_y || (ha - hb).abs() <= EDGE_EPS {
            continue;
        }
        raw += 1;

        let t = (plane_y - ha) / (hb - ha);
        let p = Point2::new(a.x + t * (b.x - a.x), a.z + t * (b.z - a.z));
        if points[..distinct].iter().all(|q| (p - q).norm() > MERGE_EPS) {
            points[distinct] = p;
            distinct += 1;
        }
    }

    match (distinct, raw) {
        (2, _) => Crossing::Segment(Segment::new(points[0], points[1])),
        (1, 1) | (3, _) => Crossing::Defect,
        _ => Crossing::None,
    }
}
