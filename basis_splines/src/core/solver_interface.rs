use log::{debug, warn};
use nalgebra::{DMatrix, SVD};
use ndarray::Array2;

use crate::core::error::{SplineError, SplineResult};

/// Solves `design * x = rhs` in the least-squares sense, column by column of `rhs`.
///
/// The solve goes through a singular value decomposition, so tall
/// (overdetermined) and rank-deficient systems are handled. Singular values
/// below `max(m, n) * eps * sigma_max` are treated as zero, which yields the
/// minimum-norm solution.
///
/// # Arguments
/// * `design` - `m x n` system matrix, usually a basis evaluated at sample points.
/// * `rhs` - `m x k` observations, one column per output dimension.
///
/// # Returns
/// The `n x k` solution matrix.
pub fn least_squares(design: &Array2<f64>, rhs: &Array2<f64>) -> SplineResult<Array2<f64>> {
    // --- 1. Input Validation ---
    let (m, n) = design.dim();
    if rhs.nrows() != m {
        return Err(SplineError::DimensionMismatch(format!(
            "design has {} rows but the right-hand side has {}",
            m,
            rhs.nrows()
        )));
    }
    if m == 0 || n == 0 {
        return Err(SplineError::Solve(format!("empty {}x{} system", m, n)));
    }
    if design.iter().chain(rhs.iter()).any(|v| !v.is_finite()) {
        return Err(SplineError::Solve("system contains non-finite values".to_string()));
    }

    // --- 2. Decomposition ---
    let a = DMatrix::from_fn(m, n, |i, j| design[[i, j]]);
    let b = DMatrix::from_fn(m, rhs.ncols(), |i, j| rhs[[i, j]]);
    let svd = SVD::new(a, true, true);

    let max_sv = svd.singular_values.iter().cloned().fold(0.0, f64::max);
    let eps = f64::EPSILON * m.max(n) as f64 * max_sv;
    let rank = svd.singular_values.iter().filter(|&&s| s > eps).count();

    debug!("least squares: {}x{} system, {} right-hand sides, rank {}", m, n, rhs.ncols(), rank);
    if m != n {
        debug!("least squares: non-square system, returning the best fit");
    }
    if rank < n {
        warn!(
            "least squares: rank deficient system (rank {} < {} unknowns), using the minimum-norm solution",
            rank, n
        );
    }

    // --- 3. Solve ---
    let x = svd.solve(&b, eps).map_err(|e| SplineError::Solve(e.to_string()))?;
    Ok(Array2::from_shape_fn((n, rhs.ncols()), |(i, j)| x[(i, j)]))
}
