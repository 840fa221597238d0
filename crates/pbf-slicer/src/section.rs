//! Grouping of consecutive layers that share one outline.

use std::cmp::Ordering;

use pbf_math::{Point2, Tolerance};
use serde::{Deserialize, Serialize};

use crate::path::Segment;
use crate::slice::LayerSlice;

/// Default tolerance for outline comparison (mm).
pub const DEFAULT_SECTION_TOLERANCE: f64 = 0.01;

/// A contiguous run of layers whose outlines are equal within tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// First layer index (inclusive).
    pub start_layer: usize,
    /// Last layer index (inclusive).
    pub end_layer: usize,
    /// Plane height of the first layer.
    pub z_start: f64,
    /// Plane height of the last layer.
    pub z_end: f64,
    /// Outline of the first layer, representative for the whole run.
    pub segments: Vec<Segment>,
}

impl Section {
    /// Number of layers covered.
    pub fn layer_count(&self) -> usize {
        self.end_layer - self.start_layer + 1
    }

    /// Layer indices covered, in order.
    pub fn layers(&self) -> std::ops::RangeInclusive<usize> {
        self.start_layer..=self.end_layer
    }
}

/// Quantized sort key of a segment, smaller endpoint first.
fn canonical_key(seg: &Segment, tolerance: f64) -> [i64; 4] {
    let (a, b) = if lexical(&seg.a, &seg.b) == Ordering::Greater {
        (seg.b, seg.a)
    } else {
        (seg.a, seg.b)
    };
    let q = |v: f64| (v / tolerance).round() as i64;
    [q(a.x), q(a.y), q(b.x), q(b.y)]
}

fn lexical(a: &Point2, b: &Point2) -> Ordering {
    a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y))
}

/// Compare two outlines, ignoring segment order and orientation.
pub fn outlines_are_equal(a: &[Segment], b: &[Segment], tolerance: f64) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }

    let sorted = |segments: &[Segment]| {
        let mut keyed: Vec<([i64; 4], Segment)> = segments
            .iter()
            .map(|s| (canonical_key(s, tolerance), *s))
            .collect();
        keyed.sort_by(|x, y| x.0.cmp(&y.0));
        keyed
    };

    let tol = Tolerance {
        linear: tolerance,
        ..Tolerance::DEFAULT
    };
    sorted(a).iter().zip(sorted(b).iter()).all(|((_, s), (_, t))| {
        (tol.points_equal(&s.a, &t.a) && tol.points_equal(&s.b, &t.b))
            || (tol.points_equal(&s.a, &t.b) && tol.points_equal(&s.b, &t.a))
    })
}

/// Partition layers into runs of equal outlines.
///
/// Each layer is compared with its predecessor, so sections cover every
/// layer exactly once, in order.
pub fn group_sections(layers: &[LayerSlice], tolerance: f64) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut previous: Option<&LayerSlice> = None;

    for layer in layers {
        let extends = previous
            .map(|p| outlines_are_equal(&p.segments, &layer.segments, tolerance))
            .unwrap_or(false);

        match sections.last_mut() {
            Some(section) if extends => {
                section.end_layer = layer.layer_index;
                section.z_end = layer.z_height;
            }
            _ => sections.push(Section {
                start_layer: layer.layer_index,
                end_layer: layer.layer_index,
                z_start: layer.z_height,
                z_end: layer.z_height,
                segments: layer.segments.clone(),
            }),
        }
        previous = Some(layer);
    }

    tracing::debug!(
        layers = layers.len(),
        sections = sections.len(),
        "grouped layers into sections"
    );
    sections
}
