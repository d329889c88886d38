//! Least squares solvers.
//!
//! Every model in this crate is linear in its coefficients once the design
//! matrix is built:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2  (+ Σ λ_j β_j^2 for penalised columns)
//! ```
//!
//! Implementation choices:
//! - SVD solve, so tall and rank-deficient systems (e.g. a quadratic fit on two
//!   points) still return the minimum-norm solution instead of failing.
//! - Ridge penalties are applied by appending `sqrt(λ_j)` rows with a zero
//!   target, which keeps a single solver path.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve a ridge-penalised least squares problem.
///
/// `penalties[j]` is the ridge strength on column `j` (`0.0` = unpenalised).
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    let n = x.nrows();
    let p = x.ncols();
    if penalties.len() != p || y.len() != n {
        return None;
    }

    let penalised: Vec<(usize, f64)> = penalties
        .iter()
        .enumerate()
        .filter(|(_, lambda)| **lambda > 0.0)
        .map(|(j, lambda)| (j, lambda.sqrt()))
        .collect();
    if penalised.is_empty() {
        return solve_least_squares(x, y);
    }

    let rows = n + penalised.len();
    let mut xa = DMatrix::<f64>::zeros(rows, p);
    let mut ya = DVector::<f64>::zeros(rows);
    xa.view_mut((0, 0), (n, p)).copy_from(x);
    ya.rows_mut(0, n).copy_from(y);
    for (k, &(j, root)) in penalised.iter().enumerate() {
        xa[(n + k, j)] = root;
    }

    solve_least_squares(&xa, &ya)
}
