//! Scan order optimization.

use pbf_math::{distance_sq, Point2};

use crate::strategy::HatchLine;

/// Reorder lines greedily to shorten jumps.
///
/// The pen starts at the first line's start. Each step picks the unplaced
/// line whose start or end is nearest to the pen, flipping it when its end
/// is strictly nearer than any start. Ties go to the lowest index.
pub fn optimize_scan_path(lines: &[HatchLine]) -> Vec<HatchLine> {
    let n = lines.len();
    if n == 0 {
        return Vec::new();
    }

    let starts: Vec<Point2> = lines.iter().map(|l| l.start).collect();
    let ends: Vec<Point2> = lines.iter().map(|l| l.end).collect();
    let mut placed = vec![false; n];
    let mut pen = starts[0];
    let mut out = Vec::with_capacity(n);

    for _ in 0..n {
        let mut best_start = (f64::INFINITY, usize::MAX);
        let mut best_end = (f64::INFINITY, usize::MAX);
        for i in 0..n {
            if placed[i] {
                continue;
            }
            let ds = distance_sq(&pen, &starts[i]);
            let de = distance_sq(&pen, &ends[i]);
            if ds < best_start.0 {
                best_start = (ds, i);
            }
            if de < best_end.0 {
                best_end = (de, i);
            }
        }

        let line = if best_start.0 <= best_end.0 {
            placed[best_start.1] = true;
            lines[best_start.1]
        } else {
            placed[best_end.1] = true;
            lines[best_end.1].reversed()
        };
        pen = line.end;
        out.push(line);
    }

    out
}

/// Total jump length between consecutive lines.
pub fn travel_distance(lines: &[HatchLine]) -> f64 {
    lines
        .windows(2)
        .map(|w| (w[1].start - w[0].end).norm())
        .sum()
}
