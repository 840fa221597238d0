//! Closed contour reconstruction from unordered segments, and island grouping.

use std::collections::HashMap;

use pbf_math::Point2;
use serde::{Deserialize, Serialize};

use crate::path::{Polygon, Segment};

/// Default grid for merging segment endpoints (mm).
pub const DEFAULT_POINT_QUANTUM: f64 = 1e-6;

/// A walk through the segment graph that ended away from its start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenChain {
    /// Visited points in walk order.
    pub points: Vec<Point2>,
}

/// Result of chaining segments into loops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContourReconstruction {
    /// Closed loops with at least three points.
    pub contours: Vec<Polygon>,
    /// Walks that did not close.
    pub open_chains: Vec<OpenChain>,
}

/// Endpoint graph with quantized, interned points.
struct SegmentGraph {
    points: Vec<Point2>,
    adjacency: Vec<Vec<(usize, usize)>>,
    edge_count: usize,
}

impl SegmentGraph {
    fn build(segments: &[Segment], quantum: f64) -> Self {
        let mut ids: HashMap<(i64, i64), usize> = HashMap::new();
        let mut graph = SegmentGraph {
            points: Vec::new(),
            adjacency: Vec::new(),
            edge_count: 0,
        };

        let mut intern = |graph: &mut SegmentGraph, p: &Point2| -> usize {
            let key = ((p.x / quantum).round() as i64, (p.y / quantum).round() as i64);
            *ids.entry(key).or_insert_with(|| {
                graph
                    .points
                    .push(Point2::new(key.0 as f64 * quantum, key.1 as f64 * quantum));
                graph.adjacency.push(Vec::new());
                graph.points.len() - 1
            })
        };

        for seg in segments {
            let a = intern(&mut graph, &seg.a);
            let b = intern(&mut graph, &seg.b);
            if a == b {
                continue;
            }
            let edge = graph.edge_count;
            graph.edge_count += 1;
            graph.adjacency[a].push((edge, b));
            graph.adjacency[b].push((edge, a));
        }
        graph
    }

    fn next_edge(&self, vertex: usize, visited: &[bool]) -> Option<(usize, usize)> {
        self.adjacency[vertex]
            .iter()
            .copied()
            .find(|&(edge, _)| !visited[edge])
    }
}

/// Chain unordered segments into closed loops.
///
/// Endpoints are snapped to a `quantum` grid. Walks start at points in the
/// order they first appear and follow the first unvisited edge at each
/// vertex.
pub fn build_contours(segments: &[Segment], quantum: f64) -> ContourReconstruction {
    let graph = SegmentGraph::build(segments, quantum);
    let mut visited = vec![false; graph.edge_count];
    let mut result = ContourReconstruction::default();

    for start in 0..graph.points.len() {
        while let Some((edge, mut current)) = graph.next_edge(start, &visited) {
            visited[edge] = true;
            let mut walk = vec![start];

            let closed = loop {
                if current == start {
                    break true;
                }
                walk.push(current);
                match graph.next_edge(current, &visited) {
                    Some((edge, next)) => {
                        visited[edge] = true;
                        current = next;
                    }
                    None => break false,
                }
            };

            let points: Vec<Point2> = walk.iter().map(|&i| graph.points[i]).collect();
            if !closed {
                result.open_chains.push(OpenChain { points });
            } else if points.len() >= 3 {
                result.contours.push(Polygon::new(points));
            } else {
                tracing::debug!(points = points.len(), "dropping degenerate loop");
            }
        }
    }

    result
}

/// An outer boundary with the holes it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Island {
    /// Outer boundary, counter-clockwise.
    pub outer: Polygon,
    /// Holes, clockwise.
    pub holes: Vec<Polygon>,
}

impl Island {
    /// Rings in strategy order: outer first, then holes.
    pub fn rings(&self) -> Vec<Polygon> {
        std::iter::once(self.outer.clone())
            .chain(self.holes.iter().cloned())
            .collect()
    }

    /// Enclosed area (outer minus holes).
    pub fn area(&self) -> f64 {
        self.outer.signed_area().abs()
            - self
                .holes
                .iter()
                .map(|h| h.signed_area().abs())
                .sum::<f64>()
    }
}

/// Group contours into islands, one nesting level deep.
///
/// Contours are taken largest first; each unclaimed contour becomes an outer
/// boundary and claims every remaining unclaimed contour whose first point it
/// contains.
pub fn group_islands(contours: &[Polygon]) -> Vec<Island> {
    let mut order: Vec<(usize, f64)> = contours
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.signed_area().abs()))
        .collect();
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut assigned = vec![false; contours.len()];
    let mut islands = Vec::new();

    for (pos, &(i, _)) in order.iter().enumerate() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let mut outer = contours[i].clone();
        outer.ensure_ccw();

        let mut holes = Vec::new();
        for &(j, _) in &order[pos + 1..] {
            if assigned[j] {
                continue;
            }
            let Some(first) = contours[j].points.first() else {
                continue;
            };
            if outer.contains(first) {
                assigned[j] = true;
                let mut hole = contours[j].clone();
                hole.ensure_cw();
                holes.push(hole);
            }
        }

        islands.push(Island { outer, holes });
    }

    islands
}
