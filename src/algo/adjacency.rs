//! Point representatives and edge adjacency.
//!
//! Vertices are first welded into equivalence classes: two vertices belong to
//! the same class when their positions coincide (exactly, or within an
//! epsilon). Each class is represented by its smallest vertex index. Edges are
//! then matched by their unordered pair of representatives, which produces a
//! per-triangle table of neighbours across each of its three edges.
//!
//! # Layout
//!
//! Entry `3 * f + e` of the adjacency table is the triangle across edge `e` of
//! triangle `f`, where edge `e` runs from corner `e` to corner `(e + 1) % 3`.
//! Boundary edges hold [`UNUSED32`].
//!
//! # Example
//!
//! ```
//! use isochart::algo::adjacency::build_adjacency;
//! use isochart::mesh::shapes;
//!
//! let cube = shapes::cube();
//! let result = build_adjacency(&cube.mesh(), 0.0).unwrap();
//!
//! assert_eq!(result.adjacency.len(), 36);
//! assert!(result.adjacency.iter().all(|&g| g != u32::MAX));
//! ```

use std::collections::HashMap;

use nalgebra::Point3;
use serde::Serialize;

use crate::error::{AtlasError, Result};
use crate::mesh::{MeshIndex, TriMesh, UNUSED32};

/// Output of [`build_adjacency`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjacencyResult {
    /// Representative vertex of each input vertex (`point_reps[point_reps[v]] == point_reps[v]`).
    pub point_reps: Vec<u32>,
    /// Neighbour across each triangle edge, or [`UNUSED32`].
    pub adjacency: Vec<u32>,
    /// Number of edges shared by more than two triangles.
    pub non_manifold_edges: usize,
}

/// Flat disjoint-set forest with path halving.
///
/// Unions always hang the larger root under the smaller one, so the root of a
/// set is its minimum element.
#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut x: u32) -> u32 {
        loop {
            let p = self.parent[x as usize];
            if p == x {
                return x;
            }
            let gp = self.parent[p as usize];
            self.parent[x as usize] = gp;
            x = gp;
        }
    }

    /// Merge the sets of `a` and `b`. Returns `false` if they were already joined.
    pub(crate) fn union(&mut self, a: u32, b: u32) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[hi as usize] = lo;
        true
    }

    /// Root of every element.
    pub(crate) fn into_roots(mut self) -> Vec<u32> {
        (0..self.parent.len() as u32).map(|i| self.find(i)).collect()
    }
}

/// Compute point representatives and the edge adjacency table of a mesh.
///
/// # Arguments
///
/// * `mesh` - Triangle list with 16- or 32-bit indices
/// * `epsilon` - Welding distance. `0.0` welds only bit-identical positions
///   (with `-0.0` treated as `0.0`); a positive value welds vertices whose
///   distance is at most `epsilon`, transitively.
///
/// # Returns
///
/// An [`AdjacencyResult`]. Unused triangles (all three indices equal to the
/// sentinel) get boundary entries on every edge.
///
/// # Non-manifold edges
///
/// The first two triangles on an edge are linked to each other. Any further
/// triangle on the same edge is linked one-way to the first, leaving an
/// asymmetric entry that [`validate_mesh`](super::validate::validate_mesh)
/// reports. The count is returned in `non_manifold_edges`.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidInput`] or [`AtlasError::InvalidParameter`]
/// for structurally invalid buffers or a negative / non-finite epsilon.
pub fn build_adjacency<I: MeshIndex>(mesh: &TriMesh<'_, I>, epsilon: f32) -> Result<AdjacencyResult> {
    mesh.check()?;
    let point_reps = generate_point_reps(mesh.positions(), epsilon)?;
    let (adjacency, non_manifold_edges) = edge_adjacency(mesh, &point_reps);

    if non_manifold_edges > 0 {
        log::warn!(
            "{} edge(s) are shared by more than two triangles; extra triangles are linked one-way",
            non_manifold_edges
        );
    }
    log::debug!(
        "adjacency: {} vertices, {} faces, {} boundary edges",
        mesh.num_vertices(),
        mesh.num_faces(),
        adjacency.iter().filter(|&&g| g == UNUSED32).count()
    );

    Ok(AdjacencyResult {
        point_reps,
        adjacency,
        non_manifold_edges,
    })
}

/// Weld positions into classes and return the smallest index of each class.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidParameter`] if `epsilon` is negative or not finite.
pub fn generate_point_reps(positions: &[Point3<f32>], epsilon: f32) -> Result<Vec<u32>> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(AtlasError::invalid_param(
            "epsilon",
            epsilon,
            "must be finite and non-negative",
        ));
    }

    let mut sets = DisjointSet::new(positions.len());

    if epsilon == 0.0 {
        let mut first: HashMap<[u32; 3], u32> = HashMap::with_capacity(positions.len());
        for (v, p) in positions.iter().enumerate() {
            let key = [canonical_bits(p.x), canonical_bits(p.y), canonical_bits(p.z)];
            match first.get(&key) {
                Some(&u) => {
                    sets.union(u, v as u32);
                }
                None => {
                    first.insert(key, v as u32);
                }
            }
        }
    } else {
        let eps = epsilon as f64;
        let eps_sq = eps * eps;
        let cell_of = |p: &Point3<f32>| {
            [
                (p.x as f64 / eps).floor() as i64,
                (p.y as f64 / eps).floor() as i64,
                (p.z as f64 / eps).floor() as i64,
            ]
        };

        let mut grid: HashMap<[i64; 3], Vec<u32>> = HashMap::new();
        for (v, p) in positions.iter().enumerate() {
            let cell = cell_of(p);
            let pv = p.cast::<f64>();
            for dx in -1..=1i64 {
                for dy in -1..=1i64 {
                    for dz in -1..=1i64 {
                        let key = [
                            cell[0].saturating_add(dx),
                            cell[1].saturating_add(dy),
                            cell[2].saturating_add(dz),
                        ];
                        let Some(bucket) = grid.get(&key) else {
                            continue;
                        };
                        for &u in bucket {
                            let pu = positions[u as usize].cast::<f64>();
                            if (pu - pv).norm_squared() <= eps_sq {
                                sets.union(u, v as u32);
                            }
                        }
                    }
                }
            }
            grid.entry(cell).or_default().push(v as u32);
        }
    }

    Ok(sets.into_roots())
}

#[inline]
fn canonical_bits(x: f32) -> u32 {
    if x == 0.0 {
        0
    } else {
        x.to_bits()
    }
}

/// Match triangle edges by representative pair. Returns the table and the
/// number of edges with more than two triangles.
pub(crate) fn edge_adjacency<I: MeshIndex>(mesh: &TriMesh<'_, I>, point_reps: &[u32]) -> (Vec<u32>, usize) {
    let nf = mesh.num_faces();
    let mut adjacency = vec![UNUSED32; 3 * nf];
    let mut edges: HashMap<(u32, u32), Vec<u32>> = HashMap::with_capacity(3 * nf / 2 + 1);
    let mut order: Vec<(u32, u32)> = Vec::with_capacity(3 * nf / 2 + 1);

    for f in 0..nf {
        let Some(face) = mesh.face(f) else {
            continue;
        };
        for e in 0..3 {
            let a = point_reps[face[e]];
            let b = point_reps[face[(e + 1) % 3]];
            if a == b {
                continue;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            let slots = edges.entry(key).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            slots.push((3 * f + e) as u32);
        }
    }

    let mut non_manifold = 0;
    for key in &order {
        let slots = &edges[key];
        if slots.len() < 2 {
            continue;
        }
        if slots.len() > 2 {
            non_manifold += 1;
        }
        let first = slots[0];
        let first_face = first / 3;
        let second_face = slots[1] / 3;
        if first_face != second_face {
            adjacency[first as usize] = second_face;
            adjacency[slots[1] as usize] = first_face;
        }
        for &slot in &slots[2..] {
            if slot / 3 != first_face {
                adjacency[slot as usize] = first_face;
            }
        }
    }

    (adjacency, non_manifold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    fn is_symmetric(adjacency: &[u32]) -> bool {
        adjacency.iter().enumerate().all(|(slot, &g)| {
            g == UNUSED32 || adjacency[3 * g as usize..3 * g as usize + 3].contains(&((slot / 3) as u32))
        })
    }

    #[test]
    fn test_cube_adjacency() {
        let cube = shapes::cube();
        let result = build_adjacency(&cube.mesh(), 0.0).unwrap();

        assert_eq!(result.adjacency.len(), 36);
        assert!(result.adjacency.iter().all(|&g| g < 12));
        assert!(is_symmetric(&result.adjacency));
        assert_eq!(result.non_manifold_edges, 0);

        // 24 vertices collapse onto the 8 cube corners.
        let mut reps = result.point_reps.clone();
        reps.sort_unstable();
        reps.dedup();
        assert_eq!(reps.len(), 8);
        for (v, &r) in result.point_reps.iter().enumerate() {
            assert!(r as usize <= v);
            assert_eq!(result.point_reps[r as usize], r);
        }
    }

    #[test]
    fn test_idempotent() {
        let sphere = shapes::uv_sphere(10, 6, 1.0);
        let a = build_adjacency(&sphere.mesh(), 1e-5).unwrap();
        let b = build_adjacency(&sphere.mesh(), 1e-5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_boundary() {
        let grid = shapes::grid(2, 2, 1.0, 1.0);
        let result = build_adjacency(&grid.mesh(), 0.0).unwrap();
        // 8 boundary edges on a 2x2 grid.
        assert_eq!(result.adjacency.iter().filter(|&&g| g == UNUSED32).count(), 8);
        assert!(is_symmetric(&result.adjacency));
    }

    #[test]
    fn test_exact_weld_ignores_near_points() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1e-6, 0.0, 0.0),
            Point3::new(-0.0, 0.0, 0.0),
        ];
        let reps = generate_point_reps(&positions, 0.0).unwrap();
        assert_eq!(reps, vec![0, 1, 0]);
    }

    #[test]
    fn test_epsilon_weld() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.005),
            Point3::new(1.0, 0.009, 0.0),
            Point3::new(0.0, 0.0, 0.5),
        ];
        let reps = generate_point_reps(&positions, 0.01).unwrap();
        assert_eq!(reps, vec![0, 1, 0, 1, 4]);
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let cube = shapes::cube();
        assert!(build_adjacency(&cube.mesh(), -1.0).is_err());
        assert!(build_adjacency(&cube.mesh(), f32::NAN).is_err());
    }

    #[test]
    fn test_non_manifold_edge() {
        // Three triangles fanned around the edge 0-1.
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let indices = [0u32, 1, 2, 1, 0, 3, 0, 1, 4];
        let mesh = TriMesh::new(&positions, &indices);
        let result = build_adjacency(&mesh, 0.0).unwrap();

        assert_eq!(result.non_manifold_edges, 1);
        assert_eq!(result.adjacency[0], 1);
        assert_eq!(result.adjacency[3], 0);
        assert_eq!(result.adjacency[6], 0);
        assert!(!is_symmetric(&result.adjacency));
    }

    #[test]
    fn test_u16_and_unused_faces() {
        let grid = shapes::grid(1, 1, 1.0, 1.0);
        let mut indices: Vec<u16> = grid.indices.iter().map(|&i| i as u16).collect();
        indices.extend_from_slice(&[u16::MAX; 3]);
        let mesh = TriMesh::new(&grid.positions, &indices);
        let result = build_adjacency(&mesh, 0.0).unwrap();

        assert_eq!(result.adjacency.len(), 9);
        assert_eq!(&result.adjacency[6..], &[UNUSED32; 3]);
        assert_eq!(result.adjacency.iter().filter(|&&g| g != UNUSED32).count(), 2);
    }

    #[test]
    fn test_disjoint_set_min_root() {
        let mut sets = DisjointSet::new(5);
        assert!(sets.union(4, 2));
        assert!(sets.union(3, 4));
        assert!(!sets.union(2, 3));
        assert_eq!(sets.into_roots(), vec![0, 1, 2, 2, 2]);
    }
}
