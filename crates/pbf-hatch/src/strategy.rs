//! Hatch line, parameters and the strategy trait.

use std::fmt;
use std::str::FromStr;

use pbf_math::Point2;
use pbf_slicer::Polygon;
use serde::{Deserialize, Serialize};

use crate::error::{HatchError, Result};
use crate::optimize::optimize_scan_path;
use crate::region::Region;

/// A single scan vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HatchLine {
    /// Start point (mm).
    pub start: Point2,
    /// End point (mm).
    pub end: Point2,
    /// Scan speed (mm/s).
    pub speed: f64,
    /// Beam power (0-1).
    pub power: f64,
    /// Layer this line belongs to.
    pub layer_index: usize,
    /// True for boundary lines, false for infill.
    pub is_contour: bool,
}

impl HatchLine {
    /// Length of the line.
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Direction of the line in degrees, in `(-180, 180]`.
    pub fn angle_degrees(&self) -> f64 {
        let d = self.end - self.start;
        d.y.atan2(d.x).to_degrees()
    }

    /// Same line scanned in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            ..*self
        }
    }
}

/// Process parameters for hatch generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatchingParameters {
    /// Distance between infill lines (mm).
    pub hatch_spacing: f64,
    /// Base infill angle (degrees).
    pub hatch_angle: f64,
    /// Angle increment per layer (degrees).
    pub layer_rotation: f64,
    /// Inset of the infill from the boundary (mm).
    pub border_offset: f64,
    /// Emit boundary lines.
    pub enable_contours: bool,
    /// Number of boundary passes.
    pub contour_count: u32,
    /// Scan speed (mm/s).
    pub scan_speed: f64,
    /// Beam power (0-1).
    pub power_level: f64,
    /// Beam off during jumps. Written to the export metadata.
    pub enable_skywriting: bool,
    /// Speed of non-scanning moves (mm/s). Written to the export metadata.
    pub jump_speed: f64,
    /// Infill density (0-1); line spacing is `hatch_spacing / infill_density`.
    pub infill_density: f64,
    /// Infill lines shorter than this are dropped (mm).
    pub min_feature_size: f64,
    /// Reorder lines to shorten jumps.
    pub optimize_path: bool,
    /// Alternate the direction of adjacent infill lines.
    pub bidirectional: bool,
}

impl Default for HatchingParameters {
    fn default() -> Self {
        Self {
            hatch_spacing: 0.1,
            hatch_angle: 0.0,
            layer_rotation: 67.0,
            border_offset: 0.0,
            enable_contours: true,
            contour_count: 1,
            scan_speed: 1000.0,
            power_level: 1.0,
            enable_skywriting: true,
            jump_speed: 5000.0,
            infill_density: 1.0,
            min_feature_size: 0.0,
            optimize_path: true,
            bidirectional: true,
        }
    }
}

impl HatchingParameters {
    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if self.hatch_spacing.is_nan() || self.hatch_spacing <= 0.0 {
            return Err(HatchError::InvalidParameters(format!(
                "hatch_spacing must be positive, got {}",
                self.hatch_spacing
            )));
        }
        if !(0.0..=1.0).contains(&self.power_level) {
            return Err(HatchError::InvalidParameters(format!(
                "power_level must be between 0 and 1, got {}",
                self.power_level
            )));
        }
        if !(0.0..=1.0).contains(&self.infill_density) {
            return Err(HatchError::InvalidParameters(format!(
                "infill_density must be between 0 and 1, got {}",
                self.infill_density
            )));
        }
        Ok(())
    }

    /// Effective infill line spacing, or `None` when density is zero.
    pub fn line_spacing(&self) -> Option<f64> {
        (self.infill_density > 0.0).then(|| self.hatch_spacing / self.infill_density)
    }

    /// Inward offset applied to the region before infill.
    ///
    /// Extra contour passes push the infill further in, one spacing each.
    pub fn infill_erosion(&self) -> f64 {
        let passes = if self.enable_contours {
            self.contour_count.saturating_sub(1)
        } else {
            0
        };
        self.border_offset + passes as f64 * self.hatch_spacing
    }

    /// Shortest infill line kept.
    pub fn min_line_length(&self) -> f64 {
        self.min_feature_size.max(1e-9)
    }

    pub(crate) fn line(&self, start: Point2, end: Point2, layer_index: usize, is_contour: bool) -> HatchLine {
        HatchLine {
            start,
            end,
            speed: self.scan_speed,
            power: self.power_level,
            layer_index,
            is_contour,
        }
    }
}

/// Identifier of a hatching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HatchPattern {
    /// Parallel lines, rotated per layer.
    #[default]
    Lines,
    /// Two crossed sets of parallel lines.
    Grid,
    /// Inset rings following the boundary.
    Concentric,
}

impl HatchPattern {
    /// All built-in patterns.
    pub const ALL: [HatchPattern; 3] = [HatchPattern::Lines, HatchPattern::Grid, HatchPattern::Concentric];

    /// Lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            HatchPattern::Lines => "lines",
            HatchPattern::Grid => "grid",
            HatchPattern::Concentric => "concentric",
        }
    }
}

impl fmt::Display for HatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HatchPattern {
    type Err = HatchError;

    fn from_str(s: &str) -> Result<Self> {
        HatchPattern::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| HatchError::UnknownPatternName(s.to_string()))
    }
}

/// A hatching algorithm.
///
/// `contours[0]` is the outer boundary of one island; any further contours
/// are its holes.
pub trait HatchStrategy: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Short description.
    fn description(&self) -> &str {
        ""
    }

    /// Generate scan lines for one island.
    fn generate(
        &self,
        contours: &[Polygon],
        params: &HatchingParameters,
        layer_index: usize,
    ) -> Vec<HatchLine>;

    /// Key under which the output for `layer_index` may be reused for other
    /// layers of the same outline. Layers with equal keys get equal lines.
    fn reuse_key(&self, params: &HatchingParameters, layer_index: usize) -> Option<u64> {
        Some(effective_angle(params.hatch_angle, layer_index, params.layer_rotation).to_bits())
    }
}

/// Infill angle for a layer, normalized to `[0, 180)`.
pub fn effective_angle(base_angle: f64, layer_index: usize, rotation: f64) -> f64 {
    let angle = (base_angle + layer_index as f64 * rotation).rem_euclid(180.0);
    if angle >= 180.0 {
        0.0
    } else {
        angle
    }
}

/// Boundary lines for an island.
///
/// Pass 0 traces the input rings; pass `k` traces the region inset by
/// `k * hatch_spacing` and stops once the inset vanishes.
pub fn emit_contours(
    contours: &[Polygon],
    params: &HatchingParameters,
    layer_index: usize,
) -> Vec<HatchLine> {
    if !params.enable_contours || params.contour_count == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    trace_rings(&mut lines, contours.iter(), params, layer_index);

    if params.contour_count > 1 {
        if let Some(region) = Region::from_contours(contours) {
            for pass in 1..params.contour_count {
                let Some(inset) = region.eroded(pass as f64 * params.hatch_spacing) else {
                    break;
                };
                trace_rings(&mut lines, inset.rings(), params, layer_index);
            }
        }
    }

    lines
}

fn trace_rings<'a>(
    lines: &mut Vec<HatchLine>,
    rings: impl Iterator<Item = &'a Polygon>,
    params: &HatchingParameters,
    layer_index: usize,
) {
    for ring in rings.filter(|r| r.len() >= 2) {
        lines.extend(ring.edges().map(|(a, b)| params.line(a, b, layer_index, true)));
    }
}

/// Apply path optimization when enabled.
pub(crate) fn finish(lines: Vec<HatchLine>, params: &HatchingParameters) -> Vec<HatchLine> {
    if params.optimize_path && lines.len() > 1 {
        optimize_scan_path(&lines)
    } else {
        lines
    }
}

/// Validate, logging and failing closed on bad parameters.
pub(crate) fn accept(params: &HatchingParameters, strategy: &str) -> bool {
    match params.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(strategy, error = %e, "skipping hatching");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ])
    }

    #[test]
    fn test_effective_angle() {
        assert_relative_eq!(effective_angle(0.0, 1, 67.0), 67.0);
        assert_relative_eq!(effective_angle(0.0, 3, 67.0), 21.0);
        assert_relative_eq!(effective_angle(-30.0, 0, 67.0), 150.0);
        assert_relative_eq!(effective_angle(200.0, 0, 90.0), 20.0);
        for layer in 0..20 {
            let a = effective_angle(15.0, layer, 67.0);
            assert!((0.0..180.0).contains(&a));
        }
    }

    #[test]
    fn test_effective_angle_periodic() {
        for &(base, rot) in &[(0.0, 67.0), (12.5, 90.0), (45.0, 30.0)] {
            for layer in 0..10 {
                let a = effective_angle(base, layer, rot);
                let b = effective_angle(base + 180.0, layer, rot);
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
            assert_relative_eq!(
                effective_angle(base, 0, rot),
                f64::rem_euclid(base, 180.0)
            );
        }
    }

    #[test]
    fn test_parameter_validation() {
        assert!(HatchingParameters::default().validate().is_ok());
        for bad in [
            HatchingParameters {
                hatch_spacing: 0.0,
                ..Default::default()
            },
            HatchingParameters {
                power_level: 1.5,
                ..Default::default()
            },
            HatchingParameters {
                infill_density: -0.1,
                ..Default::default()
            },
        ] {
            assert!(matches!(bad.validate(), Err(HatchError::InvalidParameters(_))));
        }
    }

    #[test]
    fn test_line_spacing_and_erosion() {
        let params = HatchingParameters {
            hatch_spacing: 0.2,
            infill_density: 0.5,
            border_offset: 0.1,
            contour_count: 3,
            ..Default::default()
        };
        assert_relative_eq!(params.line_spacing().unwrap(), 0.4);
        assert_relative_eq!(params.infill_erosion(), 0.5);

        let sparse = HatchingParameters {
            infill_density: 0.0,
            ..Default::default()
        };
        assert!(sparse.line_spacing().is_none());
    }

    #[test]
    fn test_emit_contours_passes() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            contour_count: 3,
            ..Default::default()
        };
        let lines = emit_contours(&[square()], &params, 4);
        assert_eq!(lines.len(), 12);
        assert!(lines.iter().all(|l| l.is_contour && l.layer_index == 4));
        let total: f64 = lines.iter().map(HatchLine::length).sum();
        assert_relative_eq!(total, 40.0 + 32.0 + 24.0, epsilon = 1e-9);

        let off = HatchingParameters {
            enable_contours: false,
            ..params
        };
        assert!(emit_contours(&[square()], &off, 0).is_empty());
    }

    #[test]
    fn test_pattern_names() {
        assert_eq!("Grid".parse::<HatchPattern>().unwrap(), HatchPattern::Grid);
        assert_eq!(HatchPattern::Concentric.to_string(), "concentric");
        assert!("zigzag".parse::<HatchPattern>().is_err());
        let json = serde_json::to_string(&HatchPattern::Lines).unwrap();
        assert_eq!(json, "\"lines\"");
    }

    #[test]
    fn test_parameters_from_partial_json() {
        let params: HatchingParameters =
            serde_json::from_str(r#"{"hatch_spacing": 0.25, "layer_rotation": 90}"#).unwrap();
        assert_relative_eq!(params.hatch_spacing, 0.25);
        assert_relative_eq!(params.layer_rotation, 90.0);
        assert_eq!(params.contour_count, 1);
        assert!(params.bidirectional);
    }
}
