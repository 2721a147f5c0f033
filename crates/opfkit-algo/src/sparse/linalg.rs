//! Dense/sparse glue for the sensitivity engine.
//!
//! Sparse builders produce `sprs` CSR matrices; the grounded susceptance system is
//! factored once with faer's partial-pivoting LU and solved for many right-hand
//! sides (one per generator, load or branch).

use faer::prelude::SpSolver;
use faer::solvers::PartialPivLu;
use faer::{FaerMat, Mat};
use opfkit_core::{OpfkitError, OpfkitResult};
use sprs::CsMat;
use tracing::debug;

/// Densify a sparse matrix (duplicate entries are summed).
pub fn to_dense(matrix: &CsMat<f64>) -> Mat<f64> {
    let (rows, cols) = matrix.shape();
    let mut dense = Mat::zeros(rows, cols);
    for (&v, (i, j)) in matrix.iter() {
        dense.write(i, j, dense.read(i, j) + v);
    }
    dense
}

/// `A · B` for CSR `A` and dense `B`.
pub fn sparse_dense_product(a: &CsMat<f64>, b: &Mat<f64>) -> Mat<f64> {
    debug_assert!(a.is_csr());
    debug_assert_eq!(a.cols(), b.nrows());
    let mut out = Mat::zeros(a.rows(), b.ncols());
    for (i, row) in a.outer_iterator().enumerate() {
        for (k, &v) in row.iter() {
            for j in 0..b.ncols() {
                out.write(i, j, out.read(i, j) + v * b.read(k, j));
            }
        }
    }
    out
}

/// `A · x` for dense `A`.
pub fn mat_vec(a: &Mat<f64>, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.ncols(), x.len());
    (0..a.nrows())
        .map(|i| (0..a.ncols()).map(|j| a.read(i, j) * x[j]).sum())
        .collect()
}

/// Replace entries with `|v| <= tol` by exactly zero.
pub fn snap_small(matrix: &mut Mat<f64>, tol: f64) {
    for j in 0..matrix.ncols() {
        for i in 0..matrix.nrows() {
            if matrix.read(i, j).abs() <= tol {
                matrix.write(i, j, 0.0);
            }
        }
    }
}

/// Row-major copy for serialization and display.
pub fn to_rows(matrix: &Mat<f64>) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|i| (0..matrix.ncols()).map(|j| matrix.read(i, j)).collect())
        .collect()
}

/// Factored slack-grounded susceptance system `S_b · X = R`.
pub struct GroundedSystem {
    lu: PartialPivLu<f64>,
    slack: usize,
    dim: usize,
}

impl GroundedSystem {
    /// Factor a grounded bus susceptance matrix.
    ///
    /// Callers check connectivity first; an island would otherwise leave a zero
    /// pivot that only shows up as non-finite values after the solve.
    pub fn factor(grounded: &CsMat<f64>, slack: usize) -> OpfkitResult<Self> {
        let (rows, cols) = grounded.shape();
        if rows != cols {
            return Err(OpfkitError::InvalidData(format!(
                "susceptance matrix must be square, got {rows}x{cols}"
            )));
        }
        if slack >= rows {
            return Err(OpfkitError::InvalidData(format!(
                "slack index {slack} outside {rows}-bus system"
            )));
        }
        let dense = to_dense(grounded);
        let lu = dense.partial_piv_lu();
        debug!(buses = rows, nnz = grounded.nnz(), "factored grounded susceptance matrix");
        Ok(Self {
            lu,
            slack,
            dim: rows,
        })
    }

    /// Solve for a sparse right-hand side and zero the slack row of the result.
    pub fn solve(&self, rhs: &CsMat<f64>) -> OpfkitResult<Mat<f64>> {
        if rhs.rows() != self.dim {
            return Err(OpfkitError::InvalidData(format!(
                "right-hand side has {} rows, expected {}",
                rhs.rows(),
                self.dim
            )));
        }
        let dense_rhs = to_dense(rhs);
        let mut x = self.lu.solve(&dense_rhs);

        for j in 0..x.ncols() {
            for i in 0..x.nrows() {
                if !x.read(i, j).is_finite() {
                    return Err(OpfkitError::SingularSystem {
                        islands: 0,
                        detail: format!(
                            "non-finite angle sensitivity at bus index {i}; grounded matrix is singular"
                        ),
                    });
                }
            }
            x.write(self.slack, j, 0.0);
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn csr(rows: usize, cols: usize, entries: &[(usize, usize, f64)]) -> CsMat<f64> {
        let mut tri = TriMat::new((rows, cols));
        for &(i, j, v) in entries {
            tri.add_triplet(i, j, v);
        }
        tri.to_csr()
    }

    #[test]
    fn test_sparse_dense_product_matches_manual() {
        let a = csr(2, 3, &[(0, 0, 1.0), (0, 2, 2.0), (1, 1, -1.0)]);
        let b = Mat::from_fn(3, 2, |i, j| (i * 2 + j) as f64);
        let c = sparse_dense_product(&a, &b);
        // row 0: 1*[0,1] + 2*[4,5]
        assert_eq!(c.read(0, 0), 8.0);
        assert_eq!(c.read(0, 1), 11.0);
        // row 1: -1*[2,3]
        assert_eq!(c.read(1, 0), -2.0);
        assert_eq!(c.read(1, 1), -3.0);
    }

    #[test]
    fn test_snap_small_only_touches_tiny_entries() {
        let mut m = Mat::from_fn(1, 5, |_, j| [1e-14, -5e-14, -1e-13, 2e-13, 1e-12][j]);
        snap_small(&mut m, 1e-13);
        assert_eq!(m.read(0, 0), 0.0);
        assert_eq!(m.read(0, 1), 0.0);
        // The threshold itself is snapped.
        assert_eq!(m.read(0, 2), 0.0);
        assert_eq!(m.read(0, 3), 2e-13);
        assert_eq!(m.read(0, 4), 1e-12);
    }

    #[test]
    fn test_grounded_solve_zeroes_slack_row() {
        // Two buses joined by b = -10, slack at 0, grounded.
        let grounded = csr(2, 2, &[(0, 0, 1.0), (1, 1, -10.0)]);
        let system = GroundedSystem::factor(&grounded, 0).unwrap();
        let rhs = csr(2, 1, &[(0, 0, 3.0), (1, 0, 1.0)]);
        let x = system.solve(&rhs).unwrap();
        assert_eq!(x.read(0, 0), 0.0);
        assert!((x.read(1, 0) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_reported() {
        let singular = csr(2, 2, &[(0, 0, 1.0)]);
        let system = GroundedSystem::factor(&singular, 0).unwrap();
        let rhs = csr(2, 1, &[(1, 0, 1.0)]);
        let err = system.solve(&rhs).unwrap_err();
        assert!(matches!(err, OpfkitError::SingularSystem { .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let grounded = csr(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]);
        let system = GroundedSystem::factor(&grounded, 0).unwrap();
        let rhs = csr(3, 1, &[(0, 0, 1.0)]);
        assert!(matches!(system.solve(&rhs), Err(OpfkitError::InvalidData(_))));
        assert!(GroundedSystem::factor(&csr(2, 3, &[]), 0).is_err());
    }
}
