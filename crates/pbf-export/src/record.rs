//! Per-layer export records.

use pbf_hatch::HatchLine;
use serde::{Deserialize, Serialize};

use crate::LayerHatching;

/// Speed substituted for lines without a positive speed (mm/s).
pub const FALLBACK_SPEED: f64 = 1000.0;

/// A point in the layer plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XY {
    /// X (mm).
    pub x: f64,
    /// Y (mm).
    pub y: f64,
}

/// One beam move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanVector {
    /// Start point.
    pub start: XY,
    /// End point.
    pub end: XY,
    /// Scan speed (mm/s).
    pub speed: f64,
    /// Beam power (0-1).
    pub power: f64,
}

impl From<&HatchLine> for ScanVector {
    fn from(line: &HatchLine) -> Self {
        Self {
            start: XY {
                x: line.start.x,
                y: line.start.y,
            },
            end: XY {
                x: line.end.x,
                y: line.end.y,
            },
            speed: if line.speed > 0.0 {
                line.speed
            } else {
                FALLBACK_SPEED
            },
            power: line.power,
        }
    }
}

/// Scan vectors of one layer, boundaries first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Layer index.
    pub layer_index: usize,
    /// Height of the layer base above the build surface (mm).
    pub z_height: f64,
    /// Layer thickness (mm).
    pub thickness: f64,
    /// Boundary vectors in scan order.
    pub contours: Vec<ScanVector>,
    /// Infill vectors in scan order.
    pub infill: Vec<ScanVector>,
}

/// Build one record per layer, ordered by layer index.
///
/// `z_height` is `layer_index * layer_thickness`. Within each record the
/// relative scan order of lines is kept.
pub fn build_layer_records(hatching: &LayerHatching, layer_thickness: f64) -> Vec<LayerRecord> {
    hatching
        .iter()
        .map(|(&layer_index, lines)| {
            let (contours, infill): (Vec<&HatchLine>, Vec<&HatchLine>) =
                lines.iter().partition(|l| l.is_contour);
            LayerRecord {
                layer_index,
                z_height: layer_index as f64 * layer_thickness,
                thickness: layer_thickness,
                contours: contours.into_iter().map(ScanVector::from).collect(),
                infill: infill.into_iter().map(ScanVector::from).collect(),
            }
        })
        .collect()
}
