//! Build statistics.

use pbf_hatch::{travel_distance, HatchLine};
use serde::{Deserialize, Serialize};

use crate::LayerHatching;

/// Estimated scan time in seconds, summing `length / speed` over every line
/// with a positive speed.
pub fn estimate_build_time(hatching: &LayerHatching) -> f64 {
    hatching
        .values()
        .flatten()
        .filter(|l| l.speed > 0.0)
        .map(|l| l.length() / l.speed)
        .sum()
}

/// Summary of the scan vectors of a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HatchStatistics {
    /// Layers with hatching.
    pub total_layers: usize,
    /// All lines.
    pub total_lines: usize,
    /// Boundary lines.
    pub contour_lines: usize,
    /// Infill lines.
    pub infill_lines: usize,
    /// Summed length of all lines (mm).
    pub total_scan_length: f64,
    /// Summed length of boundary lines (mm).
    pub contour_length: f64,
    /// Summed length of infill lines (mm).
    pub infill_length: f64,
    /// Summed jump length between consecutive lines of a layer (mm).
    pub jump_length: f64,
    /// See [`estimate_build_time`].
    pub estimated_time_seconds: f64,
    /// Average lines per layer.
    pub avg_lines_per_layer: f64,
}

impl HatchStatistics {
    /// Compute statistics over per-layer hatching.
    pub fn from_hatching(hatching: &LayerHatching) -> Self {
        let mut stats = Self {
            total_layers: hatching.len(),
            estimated_time_seconds: estimate_build_time(hatching),
            ..Default::default()
        };

        for lines in hatching.values() {
            stats.jump_length += travel_distance(lines);
            for line in lines {
                stats.add_line(line);
            }
        }

        if stats.total_layers > 0 {
            stats.avg_lines_per_layer = stats.total_lines as f64 / stats.total_layers as f64;
        }
        stats
    }

    fn add_line(&mut self, line: &HatchLine) {
        let length = line.length();
        self.total_lines += 1;
        self.total_scan_length += length;
        if line.is_contour {
            self.contour_lines += 1;
            self.contour_length += length;
        } else {
            self.infill_lines += 1;
            self.infill_length += length;
        }
    }
}
