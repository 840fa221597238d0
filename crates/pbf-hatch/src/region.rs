//! Fill regions, erosion and scanline clipping.

use std::f64::consts::FRAC_PI_2;
use std::panic::{catch_unwind, AssertUnwindSafe};

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use cavalier_contours::shape_algorithms::{Shape, ShapeOffsetOptions};
use pbf_math::{rotate_point, Point2, Vec2};
use pbf_slicer::Polygon;

/// Mitre length limit for eroded corners, as a multiple of the offset
/// distance. Longer mitres are cut square at this length.
pub const MITER_LIMIT: f64 = 2.0;

const POINT_EPS: f64 = 1e-9;
const AREA_EPS: f64 = 1e-10;
const BULGE_EPS: f64 = 1e-9;
const COLLINEAR_EPS: f64 = 1e-9;

/// Counter-clockwise outer rings and clockwise holes, as consumed by the
/// infill strategies. Rings never cross each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Outer boundaries, counter-clockwise.
    pub outers: Vec<Polygon>,
    /// Holes, clockwise.
    pub holes: Vec<Polygon>,
}

/// An edge of the scanline edge table, oriented bottom to top.
#[derive(Debug, Clone, Copy)]
struct ScanEdge {
    y_min: f64,
    y_max: f64,
    x_at_min: f64,
    dx_dy: f64,
}

impl Region {
    /// Build a region from `contours[0]` (outer) and the remaining contours
    /// (holes). Holes with fewer than 3 points are dropped.
    pub fn from_contours(contours: &[Polygon]) -> Option<Self> {
        let (outer, holes) = contours.split_first()?;
        if outer.len() < 3 {
            return None;
        }
        let mut outer = outer.clone();
        outer.ensure_ccw();
        let holes = holes
            .iter()
            .filter(|h| h.len() >= 3)
            .map(|h| {
                let mut hole = h.clone();
                hole.ensure_cw();
                hole
            })
            .collect();
        Some(Self {
            outers: vec![outer],
            holes,
        })
    }

    /// All rings, outers first.
    pub fn rings(&self) -> impl Iterator<Item = &Polygon> + '_ {
        self.outers.iter().chain(self.holes.iter())
    }

    /// Shrink the region by `distance`: outers move in, holes grow.
    ///
    /// Rings are offset together, so a hole that grows into the boundary
    /// consumes that part of the region and a region may split. Corners are
    /// mitred (see [`MITER_LIMIT`]). Returns `None` once nothing is left.
    pub fn eroded(&self, distance: f64) -> Option<Self> {
        if distance == 0.0 {
            return Some(self.clone());
        }
        let shape = Shape::from_plines(self.rings().filter_map(to_polyline));
        let offset = match catch_unwind(AssertUnwindSafe(|| {
            shape.parallel_offset(distance, ShapeOffsetOptions::default())
        })) {
            Ok(offset) => offset,
            Err(_) => {
                tracing::warn!(distance, "region offset panicked; treating region as vanished");
                return None;
            }
        };

        let outers: Vec<Polygon> = offset
            .ccw_plines
            .iter()
            .filter_map(|p| mitred_ring(&p.polyline))
            .collect();
        if outers.is_empty() {
            return None;
        }
        let holes = offset
            .cw_plines
            .iter()
            .filter_map(|p| mitred_ring(&p.polyline))
            .collect();
        Some(Self { outers, holes })
    }

    /// Bounds of the outer rings as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        self.outers
            .iter()
            .filter_map(Polygon::bounds)
            .reduce(|(lo, hi), (min, max)| {
                (
                    Point2::new(lo.x.min(min.x), lo.y.min(min.y)),
                    Point2::new(hi.x.max(max.x), hi.y.max(max.y)),
                )
            })
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Option<Point2> {
        let (min, max) = self.bounds()?;
        Some(Point2::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0))
    }

    /// Copy rotated about `center` by `angle_degrees` (counter-clockwise).
    pub fn rotated(&self, center: &Point2, angle_degrees: f64) -> Self {
        let rotate = |ring: &Polygon| {
            Polygon::new(
                ring.points
                    .iter()
                    .map(|p| rotate_point(p, center, angle_degrees))
                    .collect(),
            )
        };
        Self {
            outers: self.outers.iter().map(rotate).collect(),
            holes: self.holes.iter().map(rotate).collect(),
        }
    }

    /// Clip horizontal scanlines `y = min_y + spacing/2 + k*spacing` against
    /// the region.
    ///
    /// All rings share one edge table. An edge crosses line `y` when exactly
    /// one endpoint lies strictly above it; the sorted crossings are paired
    /// even-odd. Intervals shorter than `min_length` are dropped. Results are
    /// ordered bottom to top, left to right.
    pub fn scanline_intervals(&self, spacing: f64, min_length: f64) -> Vec<(Point2, Point2)> {
        let Some((min, max)) = self.bounds() else {
            return Vec::new();
        };
        if spacing.is_nan() || spacing <= 0.0 {
            return Vec::new();
        }

        let mut edges: Vec<ScanEdge> = self
            .rings()
            .flat_map(|ring| ring.edges())
            .filter(|(a, b)| a.y != b.y)
            .map(|(a, b)| {
                let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
                ScanEdge {
                    y_min: lo.y,
                    y_max: hi.y,
                    x_at_min: lo.x,
                    dx_dy: (hi.x - lo.x) / (hi.y - lo.y),
                }
            })
            .collect();
        edges.sort_by(|a, b| a.y_min.total_cmp(&b.y_min));

        let mut intervals = Vec::new();
        let mut active: Vec<ScanEdge> = Vec::new();
        let mut next_edge = 0;
        let mut crossings: Vec<f64> = Vec::new();

        for k in 0usize.. {
            let y = min.y + spacing / 2.0 + k as f64 * spacing;
            if y > max.y {
                break;
            }

            while next_edge < edges.len() && edges[next_edge].y_min <= y {
                active.push(edges[next_edge]);
                next_edge += 1;
            }
            active.retain(|e| e.y_max > y);

            crossings.clear();
            crossings.extend(
                active
                    .iter()
                    .map(|e| e.x_at_min + (y - e.y_min) * e.dx_dy),
            );
            crossings.sort_by(f64::total_cmp);

            for pair in crossings.chunks_exact(2) {
                if pair[1] - pair[0] >= min_length {
                    intervals.push((Point2::new(pair[0], y), Point2::new(pair[1], y)));
                }
            }
        }

        intervals
    }
}

fn to_polyline(ring: &Polygon) -> Option<Polyline<f64>> {
    let points = clean_ring(ring.points.clone());
    if points.len() < 3 {
        return None;
    }
    let mut pline = Polyline::new();
    for p in points {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    Some(pline)
}

/// Convert an offset result back to a straight-edged ring.
///
/// Where offset edges pull apart at a corner, the offset joins them with an
/// arc around the original vertex. Each arc becomes a mitre instead.
fn mitred_ring(pline: &Polyline<f64>) -> Option<Polygon> {
    let n = pline.vertex_count();
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let v = pline.at(i);
        let start = Point2::new(v.x, v.y);
        points.push(start);
        if v.bulge.abs() > BULGE_EPS {
            let next = pline.at((i + 1) % n);
            mitre_join(&mut points, start, Point2::new(next.x, next.y), v.bulge);
        }
    }
    let ring = Polygon::new(clean_ring(points));
    (ring.len() >= 3 && ring.signed_area().abs() > AREA_EPS).then_some(ring)
}

/// Push the corner points that replace the arc `start -> end`.
///
/// The tangents at both ends are extended until they meet. When the apex
/// lies further than `MITER_LIMIT` radii from the arc center, both tangents
/// stop at that distance instead.
fn mitre_join(points: &mut Vec<Point2>, start: Point2, end: Point2, bulge: f64) {
    let chord = end - start;
    let length = chord.norm();
    if length <= POINT_EPS {
        return;
    }
    let sweep = 4.0 * bulge.atan();
    let half = sweep.abs() / 2.0;
    let radius = length / (2.0 * half.sin());
    let direction = chord / length;
    let leaving = rotate(direction, -sweep / 2.0);
    let arriving = rotate(direction, sweep / 2.0);

    if half < FRAC_PI_2 && half.cos() * MITER_LIMIT >= 1.0 {
        points.push(start + leaving * (radius * half.tan()));
    } else {
        let reach = radius * (MITER_LIMIT - half.cos()) / half.sin();
        points.push(start + leaving * reach);
        points.push(end - arriving * reach);
    }
}

fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Drop repeated points and straight-through vertices of a closed ring.
fn clean_ring(mut points: Vec<Point2>) -> Vec<Point2> {
    points.dedup_by(|a, b| (*a - *b).norm() <= POINT_EPS);
    while points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= POINT_EPS {
        points.pop();
    }
    let mut i = 0;
    while points.len() >= 3 && i < points.len() {
        let n = points.len();
        let before = points[i] - points[(i + n - 1) % n];
        let after = points[(i + 1) % n] - points[i];
        let cross = before.x * after.y - before.y * after.x;
        if cross.abs() <= COLLINEAR_EPS * before.norm() * after.norm() && before.dot(&after) > 0.0 {
            points.remove(i);
        } else {
            i += 1;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    #[test]
    fn test_region_requires_outer() {
        assert!(Region::from_contours(&[]).is_none());
        let line = Polygon::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        assert!(Region::from_contours(&[line.clone()]).is_none());

        let region = Region::from_contours(&[rect(0.0, 0.0, 4.0, 4.0), line]).unwrap();
        assert!(region.holes.is_empty());
    }

    #[test]
    fn test_scanlines_square() {
        let region = Region::from_contours(&[rect(0.0, 0.0, 10.0, 10.0)]).unwrap();
        let intervals = region.scanline_intervals(1.0, 1e-9);
        assert_eq!(intervals.len(), 10);
        for (i, (a, b)) in intervals.iter().enumerate() {
            assert_relative_eq!(a.y, 0.5 + i as f64);
            assert_relative_eq!(a.x, 0.0);
            assert_relative_eq!(b.x, 10.0);
        }
    }

    #[test]
    fn test_scanlines_split_by_hole() {
        let region = Region::from_contours(&[
            rect(0.0, 0.0, 20.0, 20.0),
            rect(7.0, 7.0, 13.0, 13.0),
        ])
        .unwrap();
        let intervals = region.scanline_intervals(1.0, 1e-9);
        // 20 rows, six of which cross the hole.
        assert_eq!(intervals.len(), 26);
        let split: Vec<_> = intervals.iter().filter(|(a, _)| a.y == 9.5).collect();
        assert_eq!(split.len(), 2);
        assert_relative_eq!(split[0].1.x, 7.0);
        assert_relative_eq!(split[1].0.x, 13.0);
    }

    #[test]
    fn test_scanline_through_vertex() {
        // Diamond: the middle scanline passes exactly through two vertices.
        let diamond = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 4.0),
            Point2::new(-2.0, 2.0),
        ]);
        let region = Region::from_contours(&[diamond]).unwrap();
        let intervals = region.scanline_intervals(2.0, 1e-9);
        // Lines at y = 1 and y = 3; each crosses exactly twice.
        assert_eq!(intervals.len(), 2);

        let intervals = region.scanline_intervals(4.0, 1e-9);
        assert_eq!(intervals.len(), 1);
        assert_relative_eq!(intervals[0].0.x, -2.0);
        assert_relative_eq!(intervals[0].1.x, 2.0);
    }

    #[test]
    fn test_erosion_grows_holes() {
        let region = Region::from_contours(&[
            rect(0.0, 0.0, 20.0, 20.0),
            rect(7.0, 7.0, 13.0, 13.0),
        ])
        .unwrap();
        let eroded = region.eroded(1.0).unwrap();
        assert_eq!(eroded.outers.len(), 1);
        assert_eq!(eroded.holes.len(), 1);
        assert_relative_eq!(eroded.outers[0].signed_area(), 324.0, epsilon = 1e-6);
        // Hole corners are mitred, so the grown hole stays square.
        assert_eq!(eroded.holes[0].len(), 4);
        assert_relative_eq!(eroded.holes[0].signed_area(), -64.0, epsilon = 1e-6);
        assert!(region.eroded(10.5).is_none());
    }

    #[test]
    fn test_hole_growing_into_boundary_vanishes() {
        // The ring is 7 wide; eroding by 8 leaves nothing even though the
        // shrunk outer ring alone would still be 4x4.
        let region = Region::from_contours(&[
            rect(0.0, 0.0, 20.0, 20.0),
            rect(7.0, 7.0, 13.0, 13.0),
        ])
        .unwrap();
        assert!(region.eroded(8.0).is_none());
        assert!(region.eroded(3.0).is_some());
    }

    #[test]
    fn test_erosion_splits_region() {
        // Dumbbell: two 10x10 lobes joined by a 2-wide neck.
        let dumbbell = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 4.0),
            Point2::new(14.0, 4.0),
            Point2::new(14.0, 0.0),
            Point2::new(24.0, 0.0),
            Point2::new(24.0, 10.0),
            Point2::new(14.0, 10.0),
            Point2::new(14.0, 6.0),
            Point2::new(10.0, 6.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]);
        let region = Region::from_contours(&[dumbbell]).unwrap();
        let eroded = region.eroded(1.5).unwrap();
        assert_eq!(eroded.outers.len(), 2);
        let (min, max) = eroded.bounds().unwrap();
        assert_relative_eq!(min.x, 1.5, epsilon = 1e-6);
        assert_relative_eq!(max.x, 22.5, epsilon = 1e-6);
    }

    /// Distance from `p` to the segment `a..b`.
    fn segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
        let ab = b - a;
        let t = ((p - a).dot(&ab) / ab.norm_squared()).clamp(0.0, 1.0);
        (p - (a + ab * t)).norm()
    }

    #[test]
    fn test_sharp_corner_keeps_full_distance() {
        let wedge = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 3.0),
        ]);
        let eroded = Region::from_contours(&[wedge.clone()])
            .unwrap()
            .eroded(0.5)
            .unwrap();
        assert_eq!(eroded.outers.len(), 1);
        for p in &eroded.outers[0].points {
            assert!(wedge.contains(p));
            for (a, b) in wedge.edges() {
                assert!(segment_distance(p, &a, &b) >= 0.5 - 1e-6, "{p:?}");
            }
        }
    }

    #[test]
    fn test_reflex_corner_is_mitred() {
        let l_shape = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 4.0),
            Point2::new(4.0, 4.0),
            Point2::new(4.0, 10.0),
            Point2::new(0.0, 10.0),
        ]);
        let eroded = Region::from_contours(&[l_shape]).unwrap().eroded(1.0).unwrap();
        let ring = &eroded.outers[0];
        assert_eq!(ring.len(), 6);
        assert_relative_eq!(ring.signed_area(), 28.0, epsilon = 1e-6);
        assert!(ring
            .points
            .iter()
            .any(|p| (p - Point2::new(3.0, 3.0)).norm() < 1e-6));
    }

    #[test]
    fn test_mitre_is_cut_past_limit() {
        // A 90 degree arc mitres to its corner; a 160 degree arc is cut square.
        let mut points = Vec::new();
        let quarter = (std::f64::consts::PI / 8.0).tan();
        mitre_join(&mut points, Point2::new(4.0, 3.0), Point2::new(3.0, 4.0), -quarter);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(points[0].y, 3.0, epsilon = 1e-9);

        points.clear();
        let center = Point2::new(0.0, 0.0);
        let (a, b) = (80f64.to_radians(), -80f64.to_radians());
        let start = Point2::new(a.cos(), a.sin());
        let end = Point2::new(b.cos(), b.sin());
        let sweep = b - a;
        mitre_join(&mut points, start, end, (sweep / 4.0).tan());
        assert_eq!(points.len(), 2);
        for p in &points {
            let along = p - center;
            assert!(along.norm() >= 1.0 - 1e-9);
            // Both cut points sit on the line x = MITER_LIMIT * radius.
            assert_relative_eq!(along.x, MITER_LIMIT, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_clean_ring_drops_collinear_points() {
        let ring = clean_ring(vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(0.0, 0.0),
        ]);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_rotation_round_trip() {
        let region = Region::from_contours(&[rect(1.0, 2.0, 5.0, 3.0)]).unwrap();
        let c = region.center().unwrap();
        let back = region.rotated(&c, 33.0).rotated(&c, -33.0);
        for (p, q) in region.outers[0].points.iter().zip(&back.outers[0].points) {
            assert_relative_eq!(p.x, q.x, epsilon = 1e-9);
            assert_relative_eq!(p.y, q.y, epsilon = 1e-9);
        }
    }
}
