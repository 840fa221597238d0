//! Parallel line hatching.

use pbf_slicer::Polygon;

use crate::region::Region;
use crate::strategy::{
    accept, effective_angle, emit_contours, finish, HatchLine, HatchStrategy, HatchingParameters,
};

/// Parallel infill lines at the layer's effective angle, plus contours.
///
/// This is the common strategy for powder-bed fusion: the infill direction
/// advances by `layer_rotation` each layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineHatching;

impl HatchStrategy for LineHatching {
    fn name(&self) -> &str {
        "Line Hatching"
    }

    fn description(&self) -> &str {
        "Parallel scan lines with configurable angle, spacing and per-layer rotation"
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

        let angle = effective_angle(params.hatch_angle, layer_index, params.layer_rotation);
        match region.eroded(params.infill_erosion()) {
            Some(infill) => lines.extend(parallel_infill(&infill, params, angle, layer_index)),
            None => tracing::debug!(layer_index, "infill region vanished after offset"),
        }

        finish(lines, params)
    }
}

/// Clip parallel lines at `angle_degrees` to a region.
///
/// The region is rotated by `-angle` about its bounding-box center so the
/// lines become horizontal scanlines, clipped, ordered, and rotated back.
pub fn parallel_infill(
    region: &Region,
    params: &HatchingParameters,
    angle_degrees: f64,
    layer_index: usize,
) -> Vec<HatchLine> {
    let Some(spacing) = params.line_spacing() else {
        return Vec::new();
    };
    let Some(center) = region.center() else {
        return Vec::new();
    };

    let aligned = region.rotated(&center, -angle_degrees);
    let mut intervals = aligned.scanline_intervals(spacing, params.min_line_length());

    if params.bidirectional {
        intervals.sort_by(|a, b| {
            let ya = (a.0.y + a.1.y) / 2.0;
            let yb = (b.0.y + b.1.y) / 2.0;
            ya.total_cmp(&yb)
        });
        for (i, interval) in intervals.iter_mut().enumerate() {
            if i % 2 == 1 {
                *interval = (interval.1, interval.0);
            }
        }
    }

    intervals
        .into_iter()
        .map(|(a, b)| {
            params.line(
                pbf_math::rotate_point(&a, &center, angle_degrees),
                pbf_math::rotate_point(&b, &center, angle_degrees),
                layer_index,
                false,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pbf_math::Point2;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    fn infill(lines: &[HatchLine]) -> Vec<HatchLine> {
        lines.iter().filter(|l| !l.is_contour).copied().collect()
    }

    /// Distance from `p` to the boundary of the axis-aligned square `0..size`.
    fn boundary_distance(p: &Point2, size: f64) -> f64 {
        p.x.abs()
            .min((p.x - size).abs())
            .min(p.y.abs())
            .min((p.y - size).abs())
    }

    #[test]
    fn test_square_scenario() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            hatch_angle: 0.0,
            enable_contours: true,
            bidirectional: true,
            ..Default::default()
        };
        let lines = LineHatching.generate(&[rect(0.0, 0.0, 10.0, 10.0)], &params, 0);

        let contour: Vec<_> = lines.iter().filter(|l| l.is_contour).collect();
        assert_eq!(contour.len(), 4);
        assert_relative_eq!(contour.iter().map(|l| l.length()).sum::<f64>(), 40.0);

        let mut ys: Vec<f64> = infill(&lines).iter().map(|l| l.start.y).collect();
        ys.sort_by(f64::total_cmp);
        assert_eq!(ys.len(), 10);
        for (i, y) in ys.iter().enumerate() {
            assert_relative_eq!(*y, 0.5 + i as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_bidirectional_alternates() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            enable_contours: false,
            optimize_path: false,
            ..Default::default()
        };
        let lines = LineHatching.generate(&[rect(0.0, 0.0, 10.0, 10.0)], &params, 0);
        assert_eq!(lines.len(), 10);
        for (i, line) in lines.iter().enumerate() {
            let forward = line.end.x > line.start.x;
            assert_eq!(forward, i % 2 == 0);
        }
    }

    #[test]
    fn test_square_with_hole_scenario() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            enable_contours: false,
            ..Default::default()
        };
        let contours = [rect(0.0, 0.0, 20.0, 20.0), rect(7.0, 7.0, 13.0, 13.0)];
        let lines = LineHatching.generate(&contours, &params, 0);
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| !l.is_contour));
        assert!(lines.iter().all(|l| l.length() <= 20.0 + 1e-9));

        for y in [7.5, 8.5, 9.5, 10.5, 11.5, 12.5] {
            let row: Vec<_> = lines
                .iter()
                .filter(|l| (l.start.y - y).abs() < 1e-9)
                .collect();
            assert_eq!(row.len(), 2, "row {y}");
            assert!(row.iter().all(|l| l.length() < 20.0));
        }
    }

    #[test]
    fn test_line_count_matches_spacing() {
        for &spacing in &[0.3, 0.7, 1.3, 2.5] {
            let params = HatchingParameters {
                hatch_spacing: spacing,
                enable_contours: false,
                ..Default::default()
            };
            let n = LineHatching
                .generate(&[rect(0.0, 0.0, 10.0, 10.0)], &params, 0)
                .len() as i64;
            let expected = (10.0 / spacing).floor() as i64;
            assert!((n - expected).abs() <= 1, "spacing {spacing}: {n} vs {expected}");
        }
    }

    #[test]
    fn test_endpoints_on_boundary() {
        let params = HatchingParameters {
            hatch_spacing: 0.5,
            hatch_angle: 37.0,
            enable_contours: false,
            ..Default::default()
        };
        let lines = LineHatching.generate(&[rect(0.0, 0.0, 10.0, 10.0)], &params, 0);
        assert!(!lines.is_empty());
        for line in &lines {
            assert!(boundary_distance(&line.start, 10.0) < 1e-9);
            assert!(boundary_distance(&line.end, 10.0) < 1e-9);
            let a = line.angle_degrees().rem_euclid(180.0);
            assert_relative_eq!(a, 37.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_layer_rotation_scenario() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            hatch_angle: 0.0,
            layer_rotation: 90.0,
            enable_contours: false,
            ..Default::default()
        };
        let square = [rect(0.0, 0.0, 10.0, 10.0)];
        let l0 = LineHatching.generate(&square, &params, 0);
        let l1 = LineHatching.generate(&square, &params, 1);
        let d0 = l0[0].angle_degrees().rem_euclid(180.0);
        let d1 = l1[0].angle_degrees().rem_euclid(180.0);
        let diff = (d1 - d0).rem_euclid(180.0);
        assert_relative_eq!(diff, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_border_offset_and_vanishing() {
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            border_offset: 2.0,
            optimize_path: false,
            ..Default::default()
        };
        let lines = LineHatching.generate(&[rect(0.0, 0.0, 10.0, 10.0)], &params, 0);
        let fill = infill(&lines);
        assert_eq!(fill.len(), 6);
        assert!(fill.iter().all(|l| (l.length() - 6.0).abs() < 1e-9));

        // Offset larger than the part: contours only.
        let params = HatchingParameters {
            border_offset: 6.0,
            ..params
        };
        let lines = LineHatching.generate(&[rect(0.0, 0.0, 10.0, 10.0)], &params, 0);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.is_contour));
    }

    #[test]
    fn test_border_offset_around_hole() {
        let contours = [rect(0.0, 0.0, 20.0, 20.0), rect(7.0, 7.0, 13.0, 13.0)];
        let params = HatchingParameters {
            hatch_spacing: 1.0,
            border_offset: 2.0,
            ..Default::default()
        };
        let fill = infill(&LineHatching.generate(&contours, &params, 0));
        assert!(!fill.is_empty());
        for p in fill.iter().flat_map(|l| [l.start, l.end]) {
            assert!((2.0 - 1e-6..=18.0 + 1e-6).contains(&p.x), "{p:?}");
            assert!((2.0 - 1e-6..=18.0 + 1e-6).contains(&p.y), "{p:?}");
            let in_grown_hole = (5.0 + 1e-6..15.0 - 1e-6).contains(&p.x)
                && (5.0 + 1e-6..15.0 - 1e-6).contains(&p.y);
            assert!(!in_grown_hole, "{p:?}");
        }

        // The grown hole meets the shrunk boundary: no infill at all.
        let params = HatchingParameters {
            border_offset: 8.0,
            ..params
        };
        let lines = LineHatching.generate(&contours, &params, 0);
        assert_eq!(lines.len(), 8);
        assert!(lines.iter().all(|l| l.is_contour));
    }

    #[test]
    fn test_invalid_input_yields_nothing() {
        let square = [rect(0.0, 0.0, 10.0, 10.0)];
        let bad = HatchingParameters {
            hatch_spacing: -1.0,
            ..Default::default()
        };
        assert!(LineHatching.generate(&square, &bad, 0).is_empty());
        assert!(LineHatching
            .generate(&[], &HatchingParameters::default(), 0)
            .is_empty());

        let empty_density = HatchingParameters {
            infill_density: 0.0,
            enable_contours: false,
            ..Default::default()
        };
        assert!(LineHatching.generate(&square, &empty_density, 0).is_empty());
    }

    #[test]
    fn test_min_feature_size_drops_slivers() {
        // A thin wedge: short rows near the tip are dropped.
        let wedge = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ]);
        let base = HatchingParameters {
            hatch_spacing: 1.0,
            enable_contours: false,
            ..Default::default()
        };
        let all = LineHatching.generate(&[wedge.clone()], &base, 0);
        let filtered = LineHatching.generate(
            &[wedge],
            &HatchingParameters {
                min_feature_size: 2.0,
                ..base
            },
            0,
        );
        assert_eq!(all.len(), 10);
        assert!(filtered.iter().all(|l| l.length() >= 2.0));
        assert_eq!(filtered.len(), 8);
    }

    #[test]
    fn test_deterministic() {
        let params = HatchingParameters {
            hatch_spacing: 0.4,
            ..Default::default()
        };
        let contours = [rect(0.0, 0.0, 20.0, 20.0), rect(7.0, 7.0, 13.0, 13.0)];
        let a = LineHatching.generate(&contours, &params, 5);
        let b = LineHatching.generate(&contours, &params, 5);
        assert_eq!(a, b);
    }
}
