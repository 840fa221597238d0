#![warn(missing_docs)]

//! Scan-line generation for powder-bed layers.
//!
//! Given the closed contours of one island (outer boundary plus holes), a
//! [`HatchStrategy`] produces boundary lines and infill lines for a layer.
//! Strategies are looked up by [`HatchPattern`] through a [`HatchRegistry`];
//! the [`HatchingEngine`] is the usual entry point.
//!
//! # Example
//!
//! ```ignore
//! use pbf_hatch::{HatchPattern, HatchingEngine, HatchingParameters};
//!
//! let engine = HatchingEngine::default();
//! let lines = engine.generate_islands(
//!     HatchPattern::Lines,
//!     &islands,
//!     &HatchingParameters::default(),
//!     layer_index,
//! )?;
//! ```

pub mod concentric;
pub mod error;
pub mod grid;
pub mod lines;
pub mod optimize;
pub mod region;
pub mod registry;
pub mod strategy;

pub use concentric::ConcentricHatching;
pub use error::{HatchError, Result};
pub use grid::GridHatching;
pub use lines::{parallel_infill, LineHatching};
pub use optimize::{optimize_scan_path, travel_distance};
pub use region::{Region, MITER_LIMIT};
pub use registry::{HatchRegistry, HatchingEngine};
pub use strategy::{
    effective_angle, emit_contours, HatchLine, HatchPattern, HatchStrategy, HatchingParameters,
};
