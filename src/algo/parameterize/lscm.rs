//! Least Squares Conformal Maps (LSCM) parameterization.
//!
//! LSCM computes a conformal (angle-preserving) parameterization of a triangle
//! mesh with boundary. The algorithm minimizes the conformal energy, which
//! measures deviation from a conformal (angle-preserving) map.
//!
//! Two boundary vertices are pinned and their unknowns eliminated, so the
//! remaining system is symmetric positive definite for a connected disk.
//! Small systems are factored densely (Cholesky); larger ones go through the
//! Jacobi-preconditioned conjugate gradient solver.
//!
//! # References
//!
//! - Lévy, B., Petitjean, S., Ray, N., & Maillot, J. (2002). "Least squares
//!   conformal maps for automatic texture atlas generation." ACM SIGGRAPH.

use std::collections::HashMap;

use nalgebra::{DVector, Point2, Point3};

use crate::error::{AtlasError, Result};

use super::sparse::{conjugate_gradient, CsrMatrix};
use super::uv::UVMap;

/// Options for LSCM parameterization.
#[derive(Debug, Clone)]
pub struct LSCMOptions {
    /// Maximum iterations for the conjugate gradient solver.
    pub max_iterations: usize,

    /// Convergence tolerance for the CG solver.
    pub tolerance: f64,

    /// Systems with at most this many unknowns are solved by dense Cholesky.
    pub dense_threshold: usize,

    /// Diagonal regularization, relative to the mean diagonal entry.
    pub regularization: f64,
}

impl Default for LSCMOptions {
    fn default() -> Self {
        Self {
            max_iterations: 4000,
            tolerance: 1e-10,
            dense_threshold: 256,
            regularization: 1e-10,
        }
    }
}

impl LSCMOptions {
    /// Set the maximum CG iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set the unknown count up to which the dense solver is used.
    pub fn with_dense_threshold(mut self, threshold: usize) -> Self {
        self.dense_threshold = threshold;
        self
    }
}

/// A vertex pinned to a specific UV coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedVertex {
    /// The vertex index to pin.
    pub vertex: usize,
    /// The fixed U coordinate.
    pub u: f64,
    /// The fixed V coordinate.
    pub v: f64,
}

impl PinnedVertex {
    /// Create a new pinned vertex.
    pub fn new(vertex: usize, u: f64, v: f64) -> Self {
        Self { vertex, u, v }
    }
}

/// Compute an LSCM parameterization of a triangulated disk.
///
/// # Arguments
///
/// * `positions` - Vertex positions of the chart
/// * `faces` - Triangles indexing into `positions`
/// * `options` - Solver options
///
/// # Returns
///
/// One UV coordinate per vertex, in 3D units: the pins are placed at their
/// true 3D distance apart along U.
///
/// # Errors
///
/// Returns [`AtlasError::InvalidInput`] if the chart is empty, closed, or its
/// boundary collapses to a point, and [`AtlasError::ConvergenceFailed`] if the
/// iterative solver does not converge.
pub fn lscm(positions: &[Point3<f64>], faces: &[[usize; 3]], options: &LSCMOptions) -> Result<UVMap> {
    let n = positions.len();
    if n < 3 || faces.is_empty() {
        return Err(AtlasError::invalid_input("chart has fewer than three vertices"));
    }

    let boundary = find_boundary_vertices(faces, n);
    if boundary.is_empty() {
        return Err(AtlasError::invalid_input("chart has no boundary"));
    }

    let (pin0, pin1) = select_farthest_boundary_pair(positions, &boundary)
        .ok_or_else(|| AtlasError::invalid_input("chart boundary collapses to a point"))?;

    let (matrix, rhs, free) = build_lscm_system(positions, faces, &pin0, &pin1, options.regularization);
    let solution = solve(&matrix, &rhs, options)?;

    let n_free = matrix.nrows() / 2;
    let mut uv_coords = vec![Point2::origin(); n];
    for (v, slot) in free.iter().enumerate() {
        if let Some(i) = *slot {
            uv_coords[v] = Point2::new(solution[i], solution[n_free + i]);
        }
    }
    uv_coords[pin0.vertex] = Point2::new(pin0.u, pin0.v);
    uv_coords[pin1.vertex] = Point2::new(pin1.u, pin1.v);

    if uv_coords.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(AtlasError::ConvergenceFailed {
            iterations: options.max_iterations,
        });
    }

    Ok(UVMap::new(uv_coords))
}

fn solve(matrix: &CsrMatrix, rhs: &DVector<f64>, options: &LSCMOptions) -> Result<DVector<f64>> {
    if matrix.nrows() <= options.dense_threshold {
        if let Some(cholesky) = matrix.to_dense().cholesky() {
            return Ok(cholesky.solve(rhs));
        }
        log::debug!("lscm: dense factorization failed, falling back to CG");
    }
    conjugate_gradient(matrix, rhs, None, options.max_iterations, options.tolerance)
}

/// Find boundary vertices from face-vertex representation.
pub(crate) fn find_boundary_vertices(faces: &[[usize; 3]], n_vertices: usize) -> Vec<usize> {
    let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();

    for face in faces {
        for i in 0..3 {
            let v0 = face[i];
            let v1 = face[(i + 1) % 3];
            let edge = if v0 < v1 { (v0, v1) } else { (v1, v0) };
            *edge_count.entry(edge).or_insert(0) += 1;
        }
    }

    // Boundary edges have count 1
    let mut is_boundary = vec![false; n_vertices];
    for ((v0, v1), count) in edge_count {
        if count == 1 {
            is_boundary[v0] = true;
            is_boundary[v1] = true;
        }
    }

    is_boundary
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i))
        .collect()
}

/// Pick two far-apart boundary vertices by two farthest-point sweeps.
///
/// The first pin sits at the origin and the second on the U axis at the
/// pins' 3D distance. Returns `None` if every boundary vertex coincides.
fn select_farthest_boundary_pair(
    vertices: &[Point3<f64>],
    boundary: &[usize],
) -> Option<(PinnedVertex, PinnedVertex)> {
    let farthest_from = |from: usize| {
        let mut best = (from, 0.0);
        for &v in boundary {
            let d = (vertices[v] - vertices[from]).norm_squared();
            if d > best.1 {
                best = (v, d);
            }
        }
        best
    };

    let (a, _) = farthest_from(*boundary.first()?);
    let (b, dist_sq) = farthest_from(a);
    if a == b || dist_sq <= 1e-24 {
        return None;
    }

    Some((
        PinnedVertex::new(a, 0.0, 0.0),
        PinnedVertex::new(b, dist_sq.sqrt(), 0.0),
    ))
}

/// Build the reduced LSCM system.
///
/// The conformal energy is a quadratic form over `[u; v]`. Pinned unknowns
/// are moved to the right-hand side; the remaining `2 * (n - 2)` unknowns are
/// laid out as all free `u` followed by all free `v`. Returns the matrix, the
/// right-hand side, and the free-unknown index of each vertex.
fn build_lscm_system(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
    pin0: &PinnedVertex,
    pin1: &PinnedVertex,
    regularization: f64,
) -> (CsrMatrix, DVector<f64>, Vec<Option<usize>>) {
    let n = vertices.len();

    let mut free = vec![None; n];
    let mut n_free = 0;
    for (v, slot) in free.iter_mut().enumerate() {
        if v != pin0.vertex && v != pin1.vertex {
            *slot = Some(n_free);
            n_free += 1;
        }
    }
    let pinned_value = |v: usize, component: usize| {
        let pin = if v == pin0.vertex { pin0 } else { pin1 };
        if component == 0 {
            pin.u
        } else {
            pin.v
        }
    };

    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    let mut rhs = DVector::zeros(2 * n_free);
    let mut diag_sum = 0.0;

    for face in faces {
        let [i, j, k] = *face;
        let pi = &vertices[i];
        let pj = &vertices[j];
        let pk = &vertices[k];

        // Project triangle to 2D local coordinates
        let e1 = pj - pi;
        let e2 = pk - pi;

        let e1_len = e1.norm();
        if e1_len < 1e-12 {
            continue; // Degenerate triangle
        }

        let x_axis = e1 / e1_len;
        let normal = e1.cross(&e2);
        let area = normal.norm() * 0.5;
        if area < 1e-16 {
            continue; // Degenerate triangle
        }

        let y_axis = normal.cross(&e1).normalize();

        // qi = (0, 0), qj = (|e1|, 0), qk = (e2·x_axis, e2·y_axis)
        let qjx = e1_len;
        let qkx = e2.dot(&x_axis);
        let qky = e2.dot(&y_axis);

        // Gradient coefficients of the linear interpolant:
        // ∂/∂x = Σ coeff_x * value, ∂/∂y = Σ coeff_y * value
        let inv_2a = 1.0 / (2.0 * area);
        let verts = [
            (i, -qky * inv_2a, (qkx - qjx) * inv_2a),
            (j, qky * inv_2a, -qkx * inv_2a),
            (k, 0.0, qjx * inv_2a),
        ];

        // Energy (∂u/∂x - ∂v/∂y)² + (∂u/∂y + ∂v/∂x)², weighted by area.
        for &(vi, ax_i, ay_i) in &verts {
            for &(vj, ax_j, ay_j) in &verts {
                let uu = (ax_i * ax_j + ay_i * ay_j) * area;
                let uv = (ay_i * ax_j - ax_i * ay_j) * area;

                // (row vertex, row component, col vertex, col component, value)
                let blocks = [
                    (0, 0, uu),  // u-u
                    (1, 1, uu),  // v-v
                    (0, 1, uv),  // u-v
                    (1, 0, -uv), // v-u
                ];
                for (rc, cc, value) in blocks {
                    let Some(r) = free[vi] else {
                        continue;
                    };
                    let row = rc * n_free + r;
                    match free[vj] {
                        Some(c) => {
                            let col = cc * n_free + c;
                            if row == col {
                                diag_sum += value;
                            }
                            triplets.push((row, col, value));
                        }
                        None => rhs[row] -= value * pinned_value(vj, cc),
                    }
                }
            }
        }
    }

    if n_free > 0 {
        let shift = regularization * (diag_sum / (2 * n_free) as f64).max(1e-300);
        for row in 0..2 * n_free {
            triplets.push((row, row, shift));
        }
    }

    let matrix = CsrMatrix::from_triplets(2 * n_free, 2 * n_free, triplets);
    (matrix, rhs, free)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_disk() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        // Simple disk: center vertex + 6 boundary vertices
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0), // center
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 0.866, 0.0),
            Point3::new(-0.5, 0.866, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(-0.5, -0.866, 0.0),
            Point3::new(0.5, -0.866, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5], [0, 5, 6], [0, 6, 1]];
        (vertices, faces)
    }

    fn create_grid(n: usize, bend: bool) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for j in 0..=n {
            for i in 0..=n {
                let x = i as f64 / n as f64;
                let z = if bend { (x * 2.0).sin() * 0.3 } else { 0.0 };
                vertices.push(Point3::new(x, j as f64 / n as f64, z));
            }
        }

        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = j * (n + 1) + i + 1;
                let v01 = (j + 1) * (n + 1) + i;
                let v11 = (j + 1) * (n + 1) + i + 1;

                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }

        (vertices, faces)
    }

    fn create_tetrahedron() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        (vertices, faces)
    }

    /// A planar chart is reproduced up to a similarity.
    fn assert_isometric(vertices: &[Point3<f64>], uv: &UVMap) {
        for a in 0..vertices.len() {
            for b in a + 1..vertices.len() {
                let d3 = (vertices[b] - vertices[a]).norm();
                let d2 = (uv.get(b) - uv.get(a)).norm();
                assert!((d3 - d2).abs() < 1e-6, "{} {}: {} vs {}", a, b, d3, d2);
            }
        }
    }

    #[test]
    fn test_lscm_single_triangle() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let uv = lscm(&vertices, &[[0, 1, 2]], &LSCMOptions::default()).unwrap();
        assert_eq!(uv.len(), 3);
        assert_isometric(&vertices, &uv);
    }

    #[test]
    fn test_lscm_planar_disk_is_isometric() {
        let (vertices, faces) = create_disk();
        let uv = lscm(&vertices, &faces, &LSCMOptions::default()).unwrap();
        assert_eq!(uv.len(), 7);
        assert_isometric(&vertices, &uv);
    }

    #[test]
    fn test_dense_and_iterative_agree() {
        let (vertices, faces) = create_grid(6, true);
        let dense = lscm(&vertices, &faces, &LSCMOptions::default()).unwrap();
        let options = LSCMOptions::default()
            .with_dense_threshold(0)
            .with_max_iterations(10_000)
            .with_tolerance(1e-11);
        let iterative = lscm(&vertices, &faces, &options).unwrap();

        for v in 0..vertices.len() {
            assert!((dense.get(v) - iterative.get(v)).norm() < 1e-5);
        }
        assert!(dense.signed_area(&faces).abs() > 0.5);
    }

    #[test]
    fn test_lscm_closed_mesh_fails() {
        let (vertices, faces) = create_tetrahedron();
        assert!(matches!(
            lscm(&vertices, &faces, &LSCMOptions::default()),
            Err(AtlasError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_find_boundary_vertices() {
        let boundary = find_boundary_vertices(&[[0, 1, 2]], 3);
        assert_eq!(boundary.len(), 3);

        let boundary = find_boundary_vertices(&[[0, 1, 2], [1, 3, 2]], 4);
        assert_eq!(boundary.len(), 4);

        let (_, faces) = create_disk();
        assert_eq!(find_boundary_vertices(&faces, 7), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_select_farthest_pair() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let (pin0, pin1) = select_farthest_boundary_pair(&vertices, &[0, 1, 2, 3]).unwrap();

        assert_eq!(pin0, PinnedVertex::new(3, 0.0, 0.0));
        assert_eq!(pin1.vertex, 0);
        assert!((pin1.u - 2.0).abs() < 1e-12);
        assert_eq!(pin1.v, 0.0);
    }

    #[test]
    fn test_select_pair_degenerate() {
        let vertices = vec![Point3::new(1.0, 1.0, 1.0); 3];
        assert!(select_farthest_boundary_pair(&vertices, &[0, 1, 2]).is_none());
    }
}
