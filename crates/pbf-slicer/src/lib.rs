#![warn(missing_docs)]

//! Plane slicing and contour reconstruction for powder-bed builds.
//!
//! This crate turns a placed triangle mesh into per-layer intersection
//! segments, groups layers that share an outline into sections, and rebuilds
//! closed contours and islands from the unordered segments.
//!
//! # Example
//!
//! ```ignore
//! use pbf_mesh::{Mesh, ModelTransform};
//! use pbf_slicer::{slice, SliceSettings};
//!
//! let mesh: Mesh = // ... loader hand-off
//! let result = slice(&mesh, &ModelTransform::default(), &SliceSettings::default())?;
//!
//! println!("Layers: {}", result.layers.len());
//! println!("Sections: {}", result.sections.len());
//! ```

pub mod contour;
pub mod error;
pub mod path;
pub mod section;
pub mod slice;

pub use contour::{
    build_contours, group_islands, ContourReconstruction, Island, OpenChain,
    DEFAULT_POINT_QUANTUM,
};
pub use error::{Result, SlicerError};
pub use path::{point_in_polygon, Polygon, Segment};
pub use section::{group_sections, outlines_are_equal, Section, DEFAULT_SECTION_TOLERANCE};
pub use slice::{slice_mesh, LayerPlan, LayerSlice, SliceTriangles};

use pbf_mesh::{Aabb, Mesh, ModelTransform, WorldMesh};
use serde::{Deserialize, Serialize};

/// Slicing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceSettings {
    /// Layer thickness (mm).
    pub layer_thickness: f64,
    /// Height of the build surface (world Y).
    pub build_surface_y: f64,
    /// Tolerance for grouping equal outlines into sections (mm).
    pub section_tolerance: f64,
    /// Grid for merging contour endpoints (mm).
    pub point_quantum: f64,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            layer_thickness: 0.2,
            build_surface_y: 0.0,
            section_tolerance: DEFAULT_SECTION_TOLERANCE,
            point_quantum: DEFAULT_POINT_QUANTUM,
        }
    }
}

impl SliceSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.layer_thickness.is_finite() || self.layer_thickness <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "layer_thickness must be positive".into(),
            ));
        }
        if !self.build_surface_y.is_finite() {
            return Err(SlicerError::InvalidSettings(
                "build_surface_y must be finite".into(),
            ));
        }
        if self.section_tolerance <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "section_tolerance must be positive".into(),
            ));
        }
        if self.point_quantum <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "point_quantum must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Complete slicing result for one model.
#[derive(Debug, Clone)]
pub struct SliceResult {
    /// World-space bounds of the placed model.
    pub world_bounds: Aabb,
    /// Planned layers.
    pub plan: LayerPlan,
    /// Raw segments per layer, bottom to top.
    pub layers: Vec<LayerSlice>,
    /// Runs of layers sharing an outline.
    pub sections: Vec<Section>,
}

impl SliceResult {
    /// Total defective triangle intersections across all layers.
    pub fn total_defects(&self) -> usize {
        self.layers.iter().map(|l| l.defects).sum()
    }
}

/// Place a mesh, slice every layer and group the layers into sections.
pub fn slice(mesh: &Mesh, transform: &ModelTransform, settings: &SliceSettings) -> Result<SliceResult> {
    settings.validate()?;

    let world = WorldMesh::from_mesh(mesh, transform, settings.build_surface_y)?;
    let plan = LayerPlan::for_mesh(&world, settings.layer_thickness)?;
    let layers = slice_mesh(&world, &plan)?;
    let sections = group_sections(&layers, settings.section_tolerance);

    tracing::info!(
        layers = layers.len(),
        sections = sections.len(),
        "sliced model"
    );

    Ok(SliceResult {
        world_bounds: world.bounds,
        plan,
        layers,
        sections,
    })
}
