#![warn(missing_docs)]

//! Statistics and per-layer export of hatch lines.
//!
//! Hatching for a build is held as a map from layer index to the lines of
//! that layer ([`LayerHatching`]). From it this crate computes summary
//! statistics and builds [`LayerRecord`]s, which a [`LayerWriter`] turns
//! into bytes.

pub mod error;
pub mod record;
pub mod stats;
pub mod writer;

use std::collections::BTreeMap;

use pbf_hatch::HatchLine;

pub use error::{ExportError, Result};
pub use record::{build_layer_records, LayerRecord, ScanVector, FALLBACK_SPEED, XY};
pub use stats::{estimate_build_time, HatchStatistics};
pub use writer::{ExportMetadata, JsonDocument, JsonLayerWriter, LayerWriter, FORMAT_VERSION};

/// Hatch lines per layer index.
pub type LayerHatching = BTreeMap<usize, Vec<HatchLine>>;
