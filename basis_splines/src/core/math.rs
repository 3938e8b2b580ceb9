//! Matrix products used to combine bases.

use ndarray::{s, Array1, Array2, ArrayView1, Axis};

use crate::core::error::{SplineError, SplineResult};

/// Kronecker product of two matrices.
///
/// The result has shape `(ra * rb, ca * cb)` and block `(i, j)` equals
/// `a[i, j] * b`.
pub fn kron(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let (ra, ca) = a.dim();
    let (rb, cb) = b.dim();
    let mut result = Array2::zeros((ra * rb, ca * cb));

    for ((i, j), &value) in a.indexed_iter() {
        result
            .slice_mut(s![i * rb..(i + 1) * rb, j * cb..(j + 1) * cb])
            .assign(&(b * value));
    }

    result
}

/// Row-wise Kronecker product.
///
/// Row `i` of the result is the Kronecker product of row `i` of `a` with row
/// `i` of `b`, so the result has shape `(rows, ca * cb)`. Evaluating two bases
/// at the same points and taking this product yields every pairwise product of
/// basis functions at those points.
///
/// # Errors
/// [`SplineError::DimensionMismatch`] if the row counts differ.
pub fn khatri_rao(a: &Array2<f64>, b: &Array2<f64>) -> SplineResult<Array2<f64>> {
    if a.nrows() != b.nrows() {
        return Err(SplineError::DimensionMismatch(format!(
            "row-wise product needs equal row counts, got {} and {}",
            a.nrows(),
            b.nrows()
        )));
    }

    let cb = b.ncols();
    let mut result = Array2::zeros((a.nrows(), a.ncols() * cb));
    for (mut out, (row_a, row_b)) in result
        .axis_iter_mut(Axis(0))
        .zip(a.axis_iter(Axis(0)).zip(b.axis_iter(Axis(0))))
    {
        out.assign(&row_kron(row_a, row_b));
    }
    Ok(result)
}

fn row_kron(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Array1<f64> {
    a.iter().flat_map(|&x| b.iter().map(move |&y| x * y)).collect()
}
