//! Closed polygon rings and 2D segments.

use pbf_math::Point2;
use serde::{Deserialize, Serialize};

/// An unordered pair of points in the slicing plane.
///
/// `a.x`/`b.x` are world X and `a.y`/`b.y` are world Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub a: Point2,
    /// Second endpoint.
    pub b: Point2,
}

impl Segment {
    /// Create a segment from two points.
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    /// Create a segment from `(x1, z1, x2, z2)`.
    pub fn from_coords(x1: f64, z1: f64, x2: f64, z2: f64) -> Self {
        Self::new(Point2::new(x1, z1), Point2::new(x2, z2))
    }

    /// Same segment with endpoints swapped.
    pub fn flipped(&self) -> Self {
        Self::new(self.b, self.a)
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }
}

/// A 2D polygon (closed ring, last point implicitly joins the first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertices of the polygon in order.
    pub points: Vec<Point2>,
}

impl Polygon {
    /// Create a new polygon from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Check if the polygon is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Signed area (shoelace). Positive for counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Is the polygon counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverse the winding order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Ensure counter-clockwise winding.
    pub fn ensure_ccw(&mut self) {
        if !self.is_ccw() {
            self.reverse();
        }
    }

    /// Ensure clockwise winding.
    pub fn ensure_cw(&mut self) {
        if self.is_ccw() {
            self.reverse();
        }
    }

    /// Perimeter length.
    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Iterate edges as `(start, end)`, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.points.len();
        let count = if n < 2 { 0 } else { n };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` if empty.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.points.first()?;
        let (min, max) = self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        });
        Some((min, max))
    }

    /// Even-odd containment test.
    pub fn contains(&self, point: &Point2) -> bool {
        point_in_polygon(point, self)
    }
}

/// Check if a point is inside a polygon (even-odd rule).
pub fn point_in_polygon(point: &Point2, polygon: &Polygon) -> bool {
    let n = polygon.points.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let pi = &polygon.points[i];
        let pj = &polygon.points[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ])
    }

    #[test]
    fn test_polygon_area() {
        let sq = square(1.0);
        assert_relative_eq!(sq.signed_area(), 1.0);
        assert!(sq.is_ccw());
        assert_relative_eq!(sq.perimeter(), 4.0);
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = square(10.0);
        assert!(sq.contains(&Point2::new(5.0, 5.0)));
        assert!(!sq.contains(&Point2::new(15.0, 5.0)));
        assert!(!sq.contains(&Point2::new(-1.0, 5.0)));
    }

    #[test]
    fn test_segment_flip() {
        let s = Segment::from_coords(0.0, 0.0, 3.0, 4.0);
        assert_relative_eq!(s.length(), 5.0);
        assert_eq!(s.flipped().a, s.b);
    }
}
