//! Geodesic distances over the dual (face) graph of a chart.
//!
//! Chart splitting measures distances between triangles rather than between
//! vertices: each node of a [`DualGraph`] is a triangle, and each edge joins
//! two triangles sharing a mesh edge. Edge weights approximate the surface
//! distance between the triangles, as selected by [`GeodesicMode`].
//!
//! # Example
//!
//! ```
//! use isochart::algo::geodesic::{dijkstra, DualGraph};
//!
//! // A path of four faces.
//! let graph = DualGraph::from_edges(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 2.0)]);
//! let result = dijkstra(&graph, 0);
//!
//! assert_eq!(result.farthest_node(), Some((3, 4.0)));
//! ```

mod dijkstra;

pub use dijkstra::{dijkstra, dijkstra_multiple};

use nalgebra::Point3;

use crate::mesh::UNUSED32;

/// How distances between neighbouring triangles are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeodesicMode {
    /// Straight centroid-to-centroid distance.
    #[default]
    Fast,
    /// Centroid to shared-edge midpoint to centroid, which follows the
    /// surface across creases.
    Quality,
}

impl GeodesicMode {
    /// Distance between two neighbouring triangles.
    ///
    /// `midpoint` is the midpoint of their shared edge; only
    /// [`GeodesicMode::Quality`] uses it.
    #[inline]
    pub fn dual_length(self, c0: &Point3<f64>, c1: &Point3<f64>, midpoint: &Point3<f64>) -> f64 {
        match self {
            GeodesicMode::Fast => (c1 - c0).norm(),
            GeodesicMode::Quality => (midpoint - c0).norm() + (c1 - midpoint).norm(),
        }
    }
}

/// Undirected weighted graph in compressed adjacency form.
#[derive(Debug, Clone, Default)]
pub struct DualGraph {
    offsets: Vec<u32>,
    targets: Vec<u32>,
    weights: Vec<f64>,
}

impl DualGraph {
    /// Build a graph of `n` nodes from undirected `(a, b, weight)` edges.
    ///
    /// Self loops and out-of-range endpoints are ignored.
    pub fn from_edges(n: usize, edges: &[(u32, u32, f64)]) -> Self {
        let valid = |&&(a, b, _): &&(u32, u32, f64)| a != b && (a as usize) < n && (b as usize) < n;

        let mut offsets = vec![0u32; n + 1];
        for &(a, b, _) in edges.iter().filter(valid) {
            offsets[a as usize + 1] += 1;
            offsets[b as usize + 1] += 1;
        }
        for i in 0..n {
            offsets[i + 1] += offsets[i];
        }

        let total = offsets[n] as usize;
        let mut targets = vec![0u32; total];
        let mut weights = vec![0.0; total];
        let mut fill = offsets.clone();
        for &(a, b, w) in edges.iter().filter(valid) {
            for (from, to) in [(a, b), (b, a)] {
                let slot = fill[from as usize] as usize;
                targets[slot] = to;
                weights[slot] = w;
                fill[from as usize] += 1;
            }
        }

        Self {
            offsets,
            targets,
            weights,
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Neighbours of a node with edge weights.
    #[inline]
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[node] as usize..self.offsets[node + 1] as usize;
        self.targets[range.clone()]
            .iter()
            .zip(&self.weights[range])
            .map(|(&t, &w)| (t as usize, w))
    }
}

/// Result of a geodesic distance computation over a [`DualGraph`].
///
/// Besides distances, records which source reached each node first, so a
/// multi-source run doubles as a region-growing partition.
#[derive(Debug, Clone)]
pub struct GeodesicResult {
    /// Distance from the nearest source; `f64::INFINITY` if unreachable.
    distances: Vec<f64>,
    /// Position in the source list of the nearest source, or [`UNUSED32`].
    labels: Vec<u32>,
}

impl GeodesicResult {
    pub(crate) fn new(distances: Vec<f64>, labels: Vec<u32>) -> Self {
        Self { distances, labels }
    }

    /// Get the distance to a node.
    #[inline]
    pub fn distance(&self, node: usize) -> f64 {
        self.distances[node]
    }

    /// Index into the source list of the source nearest to `node`.
    #[inline]
    pub fn label(&self, node: usize) -> Option<usize> {
        let l = self.labels[node];
        (l != UNUSED32).then_some(l as usize)
    }

    /// Get the number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Find the node with the maximum finite distance from the source(s).
    ///
    /// Ties go to the lowest node index.
    pub fn farthest_node(&self) -> Option<(usize, f64)> {
        let mut max_dist = f64::NEG_INFINITY;
        let mut max_node = None;

        for (i, &d) in self.distances.iter().enumerate() {
            if d.is_finite() && d > max_dist {
                max_dist = d;
                max_node = Some(i);
            }
        }

        max_node.map(|i| (i, max_dist))
    }

    /// Count the number of reachable nodes.
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }
}
