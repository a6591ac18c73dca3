//! A* route search over the location graph.
//!
//! Edge cost and heuristic are both the straight-line distance between
//! location coordinates, so the heuristic is admissible and consistent.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::graph::{Edge, Location, Point};

/// Result of route search.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedRoute {
    /// Location ids from start to goal (inclusive)
    pub nodes: Vec<String>,
    /// Total edge distance in map units
    pub distance: f64,
}

/// Entry in the open set.
#[derive(Clone, Debug)]
struct SearchNode {
    index: usize,
    f_score: f64,
    /// Insertion order, breaks f-score ties deterministically
    seq: u64,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode {}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lower f_score, then earlier insert = higher priority)
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the shortest route between two locations.
///
/// Edges referencing a missing location are skipped. Returns `None` when
/// either endpoint is unknown or the goal is unreachable, and a one-element
/// route when `start_id == end_id`.
pub fn find_path(
    start_id: &str,
    end_id: &str,
    locations: &[Location],
    edges: &[Edge],
) -> Option<PlannedRoute> {
    let index_of: HashMap<&str, usize> = locations
        .iter()
        .enumerate()
        .map(|(i, l)| (l.id.as_str(), i))
        .collect();

    let start = *index_of.get(start_id)?;
    let goal = *index_of.get(end_id)?;

    if start == goal {
        return Some(PlannedRoute {
            nodes: vec![locations[start].id.clone()],
            distance: 0.0,
        });
    }

    let adjacency = build_adjacency(&index_of, locations.len(), edges);
    let points: Vec<Point> = locations.iter().map(|l| l.coordinates).collect();
    let heuristic = |i: usize| points[i].distance(&points[goal]);

    let mut open_set = BinaryHeap::new();
    let mut g_score: Vec<f64> = vec![f64::INFINITY; locations.len()];
    let mut parent: Vec<Option<usize>> = vec![None; locations.len()];
    let mut closed_set: HashSet<usize> = HashSet::new();
    let mut seq: u64 = 0;

    g_score[start] = 0.0;
    open_set.push(SearchNode {
        index: start,
        f_score: heuristic(start),
        seq,
    });

    while let Some(current_node) = open_set.pop() {
        let current = current_node.index;

        if current == goal {
            let nodes = reconstruct_path(&parent, goal)
                .into_iter()
                .map(|i| locations[i].id.clone())
                .collect();
            return Some(PlannedRoute {
                nodes,
                distance: g_score[goal],
            });
        }

        // Skip stale heap entries
        if !closed_set.insert(current) {
            continue;
        }

        for &neighbor in &adjacency[current] {
            if closed_set.contains(&neighbor) {
                continue;
            }

            let tentative_g = g_score[current] + points[current].distance(&points[neighbor]);
            if tentative_g < g_score[neighbor] {
                g_score[neighbor] = tentative_g;
                parent[neighbor] = Some(current);
                seq += 1;
                open_set.push(SearchNode {
                    index: neighbor,
                    f_score: tentative_g + heuristic(neighbor),
                    seq,
                });
            }
        }
    }

    None
}

/// Build undirected adjacency lists in edge order.
fn build_adjacency(
    index_of: &HashMap<&str, usize>,
    node_count: usize,
    edges: &[Edge],
) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); node_count];
    let mut skipped = 0;

    for edge in edges {
        match (
            index_of.get(edge.nodes[0].as_str()),
            index_of.get(edge.nodes[1].as_str()),
        ) {
            (Some(&a), Some(&b)) if a != b => {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
            (Some(_), Some(_)) => {}
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} edge(s) with missing endpoints", skipped);
    }

    adjacency
}

/// Walk parent links back from the goal.
fn reconstruct_path(parent: &[Option<usize>], goal: usize) -> Vec<usize> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(p) = parent[current] {
        path.push(p);
        current = p;
    }

    path.reverse();
    path
}
