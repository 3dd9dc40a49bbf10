//! Simple sparse matrix and preconditioned conjugate gradient solver.
//!
//! This module provides a lightweight sparse matrix implementation (CSR format)
//! and a Jacobi-preconditioned conjugate gradient solver for symmetric positive
//! definite systems.

use nalgebra::{DMatrix, DVector};

use crate::error::{AtlasError, Result};

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in CSR format for efficient matrix-vector multiplication.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers: row_ptr[i] is the index in col_idx/values where row i starts.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column indices for each non-zero value.
    col_idx: Vec<usize>,
    /// Non-zero values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());

        let mut prev = None;
        for (row, col, val) in triplets {
            if prev == Some((row, col)) {
                if let Some(last) = values.last_mut() {
                    *last += val;
                }
                continue;
            }
            col_idx.push(col);
            values.push(val);
            row_ptr[row + 1] += 1;
            prev = Some((row, col));
        }

        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);
        for i in 0..self.rows {
            let mut sum = 0.0;
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
        y
    }

    /// Diagonal entries (zero where not stored).
    pub fn diagonal(&self) -> DVector<f64> {
        let n = self.rows.min(self.cols);
        let mut d = DVector::zeros(n);
        for i in 0..n {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                if self.col_idx[k] == i {
                    d[i] = self.values[k];
                }
            }
        }
        d
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                m[(i, self.col_idx[k])] = self.values[k];
            }
        }
        m
    }
}

/// Solve A*x = b using the Jacobi-preconditioned Conjugate Gradient method.
///
/// Requires A to be symmetric positive definite.
///
/// # Arguments
///
/// * `a` - The system matrix (must be symmetric positive definite)
/// * `b` - The right-hand side vector
/// * `x0` - Optional initial guess (zeros if None)
/// * `max_iter` - Maximum number of iterations
/// * `tolerance` - Convergence tolerance (relative residual norm)
///
/// # Returns
///
/// The solution vector x.
///
/// # Errors
///
/// Returns [`AtlasError::ConvergenceFailed`] if the residual does not drop
/// below the tolerance within `max_iter` iterations, and
/// [`AtlasError::InvalidInput`] on a dimension mismatch.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let n = b.len();
    if a.nrows() != n || a.ncols() != n {
        return Err(AtlasError::invalid_input(format!(
            "system is {}x{} but right-hand side has {} rows",
            a.nrows(),
            a.ncols(),
            n
        )));
    }

    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    let b_norm = b.norm();
    if b_norm < 1e-15 {
        return Ok(DVector::zeros(n));
    }

    // Jacobi preconditioner; non-positive diagonal entries fall back to identity.
    let inv_diag = a.diagonal().map(|d| if d > 1e-300 { 1.0 / d } else { 1.0 });

    // r = b - A*x
    let mut r = b - a.mul_vec(&x);
    if r.norm() / b_norm < tolerance {
        return Ok(x);
    }

    let mut z = r.component_mul(&inv_diag);
    let mut p = z.clone();
    let mut rz = r.dot(&z);

    for _iter in 0..max_iter {
        let ap = a.mul_vec(&p);

        let p_ap = p.dot(&ap);
        if p_ap.abs() < 1e-300 {
            // Matrix might be singular or nearly so
            break;
        }
        let alpha = rz / p_ap;

        x += alpha * &p;
        r -= alpha * &ap;

        if r.norm() / b_norm < tolerance {
            return Ok(x);
        }

        z = r.component_mul(&inv_diag);
        let new_rz = r.dot(&z);
        let beta = new_rz / rz;
        p = &z + beta * &p;
        rz = new_rz;
    }

    Err(AtlasError::ConvergenceFailed {
        iterations: max_iter,
    })
}
