//! Concentric ring infill.

use pbf_slicer::Polygon;

use crate::region::Region;
use crate::strategy::{accept, emit_contours, finish, HatchLine, HatchStrategy, HatchingParameters};

/// Upper bound on rings per island.
const MAX_RINGS: usize = 100_000;

/// Infill made of successive insets of the boundary.
///
/// Ring `k` is the region inset by `erosion + s/2 + k*s`, where `s` is the
/// effective line spacing. The result does not depend on the layer angle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcentricHatching;

impl HatchStrategy for ConcentricHatching {
    fn name(&self) -> &str {
        "Concentric Hatching"
    }

    fn description(&self) -> &str {
        "Inset rings following the part boundary"
    }

    fn generate(
        &self,
        contours: &[Polygon],
        params: &HatchingParameters,
        layer_index: usize,
    ) -> Vec<HatchLine> {
        if !accept(params, self.name()) {
            return Vec::new();
        }
        let Some(region) = Region::from_contours(contours) else {
            return Vec::new();
        };

        let mut lines = emit_contours(contours, params, layer_index);

        if let Some(spacing) = params.line_spacing() {
            let base = params.infill_erosion() + spacing / 2.0;
            for k in 0..MAX_RINGS {
                let Some(ring) = region.eroded(base + k as f64 * spacing) else {
                    break;
                };
                for polygon in ring.rings() {
                    lines.extend(
                        polygon
                            .edges()
                            .filter(|(a, b)| (b - a).norm() >= params.min_line_length())
                            .map(|(a, b)| params.line(a, b, layer_index, false)),
                    );
                }
            }
        }

        finish(lines, params)
    }

    fn reuse_key(&self, _params: &HatchingParameters, _layer_index: usize) -> Option<u64> {
        Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pbf_math::Point2;

    fn square() -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ])
    }

    #[test]
    fn test_rings_shrink_to_center() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            enable_contours: false,
            optimize_path: false,
            ..Default::default()
        };
        let lines = ConcentricHatching.generate(&[square()], &params, 0);
        // Insets 0.5, 1.5, 2.5, 3.5, 4.5 -> squares of side 9, 7, 5, 3, 1.
        assert_eq!(lines.len(), 20);
        let total: f64 = lines.iter().map(HatchLine::length).sum();
        assert_relative_eq!(total, 4.0 * (9.0 + 7.0 + 5.0 + 3.0 + 1.0), epsilon = 1e-9);
        assert!(lines.iter().all(|l| !l.is_contour));
    }

    #[test]
    fn test_rings_around_hole_stay_in_part() {
        let rect = |x0: f64, y0: f64, x1: f64, y1: f64| {
            Polygon::new(vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ])
        };
        let params = HatchingParameters {
            hatch_spacing: 0.5,
            enable_contours: false,
            ..Default::default()
        };
        let contours = [rect(0.0, 0.0, 20.0, 20.0), rect(7.0, 7.0, 13.0, 13.0)];
        let lines = ConcentricHatching.generate(&contours, &params, 0);

        // Insets 0.25, 0.75, .., 3.25; the next one closes the 7 wide band.
        assert_eq!(lines.len(), 7 * 8);
        for p in lines.iter().flat_map(|l| [l.start, l.end]) {
            assert!((0.25 - 1e-6..=19.75 + 1e-6).contains(&p.x), "{p:?}");
            assert!((0.25 - 1e-6..=19.75 + 1e-6).contains(&p.y), "{p:?}");
            let in_hole = (6.75 + 1e-6..13.25 - 1e-6).contains(&p.x)
                && (6.75 + 1e-6..13.25 - 1e-6).contains(&p.y);
            assert!(!in_hole, "{p:?}");
        }
    }

    #[test]
    fn test_angle_independent() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            ..Default::default()
        };
        let a = ConcentricHatching.generate(&[square()], &params, 0);
        let b = ConcentricHatching.generate(&[square()], &params, 7);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!((x.start, x.end), (y.start, y.end));
        }
        assert_eq!(
            ConcentricHatching.reuse_key(&params, 0),
            ConcentricHatching.reuse_key(&params, 7)
        );
    }
}
