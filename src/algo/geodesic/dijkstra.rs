//! Dijkstra's algorithm over a [`DualGraph`].
//!
//! Computes shortest path distances between triangles. With several sources
//! the run assigns every node to its nearest source, which is how charts are
//! grown from seed triangles.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::mesh::UNUSED32;

use super::{DualGraph, GeodesicResult};

/// Entry in Dijkstra's priority queue.
#[derive(Debug, Clone)]
struct DijkstraEntry {
    /// The node index.
    node: usize,
    /// Distance from source.
    distance: f64,
}

impl DijkstraEntry {
    fn new(node: usize, distance: f64) -> Self {
        Self { node, distance }
    }
}

// Implement ordering for min-heap (BinaryHeap is a max-heap by default)
impl PartialEq for DijkstraEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DijkstraEntry {}

impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior; lower node wins ties.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Compute distances from a single source node.
pub fn dijkstra(graph: &DualGraph, source: usize) -> GeodesicResult {
    dijkstra_multiple(graph, &[source])
}

/// Compute distances from several source nodes at once.
///
/// All sources start at distance 0. The label of each reachable node is the
/// position in `sources` of the source that reached it first; the labelled
/// regions are connected in the graph.
///
/// # Arguments
///
/// * `graph` - The dual graph
/// * `sources` - Source nodes; out-of-range entries are ignored
///
/// # Returns
///
/// A [`GeodesicResult`] with distances and source labels for every node.
pub fn dijkstra_multiple(graph: &DualGraph, sources: &[usize]) -> GeodesicResult {
    let n = graph.num_nodes();

    let mut distances = vec![f64::INFINITY; n];
    let mut labels = vec![UNUSED32; n];
    let mut heap = BinaryHeap::new();

    for (label, &source) in sources.iter().enumerate() {
        if source < n && labels[source] == UNUSED32 {
            distances[source] = 0.0;
            labels[source] = label as u32;
            heap.push(DijkstraEntry::new(source, 0.0));
        }
    }

    while let Some(entry) = heap.pop() {
        let u = entry.node;
        let dist_u = entry.distance;

        // Stale entry
        if dist_u > distances[u] {
            continue;
        }

        for (v, w) in graph.neighbors(u) {
            let new_dist = dist_u + w;
            if new_dist < distances[v] {
                distances[v] = new_dist;
                labels[v] = labels[u];
                heap.push(DijkstraEntry::new(v, new_dist));
            }
        }
    }

    GeodesicResult::new(distances, labels)
}
