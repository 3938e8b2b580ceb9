use log::trace;
use ndarray::Array1;

use crate::core::error::{SplineError, SplineResult};

/// Generates a clamped knot vector with uniformly spaced interior knots.
///
/// # Arguments
/// * `x_min` - Left end of the domain.
/// * `x_max` - Right end of the domain.
/// * `num_internal_knots` - Number of knots to place strictly between the boundaries.
/// * `order` - Order of the B-spline (m).
///
/// # Returns
/// The knot vector `[x_min; m] ++ interior ++ [x_max; m]`.
pub fn generate_uniform_knots(
    x_min: f64,
    x_max: f64,
    num_internal_knots: usize,
    order: usize,
) -> SplineResult<Array1<f64>> {
    if order == 0 {
        return Err(SplineError::InvalidOrder(order));
    }
    if !(x_min < x_max) {
        return Err(SplineError::InvalidArgument(format!(
            "x_min ({}) must be less than x_max ({}).",
            x_min, x_max
        )));
    }

    let mut knots_vec = Vec::with_capacity(2 * order + num_internal_knots);
    knots_vec.extend(std::iter::repeat(x_min).take(order));

    let step = (x_max - x_min) / (num_internal_knots + 1) as f64;
    for i in 1..=num_internal_knots {
        knots_vec.push(x_min + i as f64 * step);
    }

    knots_vec.extend(std::iter::repeat(x_max).take(order));

    Ok(Array1::from(knots_vec))
}

/// Validates a knot vector for a basis of the given order.
///
/// The vector must hold finite, non-decreasing values and at least `order + 1`
/// entries, so that the basis has at least one function.
pub fn validate_knots(knots: &Array1<f64>, order: usize) -> SplineResult<()> {
    if order == 0 {
        return Err(SplineError::InvalidOrder(order));
    }
    if knots.len() < order + 1 {
        return Err(SplineError::InsufficientKnots {
            order,
            required: order + 1,
            provided: knots.len(),
        });
    }
    if let Some(idx) = knots.iter().position(|k| !k.is_finite()) {
        return Err(SplineError::InvalidKnotVector(format!(
            "knot t_{} = {} is not finite",
            idx, knots[idx]
        )));
    }
    for i in 0..(knots.len() - 1) {
        if knots[i] > knots[i + 1] {
            return Err(SplineError::InvalidKnotVector(format!(
                "knots are not non-decreasing: t_{}={} > t_{}={}",
                i,
                knots[i],
                i + 1,
                knots[i + 1]
            )));
        }
    }

    Ok(())
}

/// Expands breakpoints and continuities into a knot vector.
///
/// Each breakpoint is emitted `order - continuity` times. A continuity of
/// `order - 1` yields a simple knot, a continuity of `0` a knot of full
/// multiplicity. Values of `continuity >= order` emit nothing.
pub fn to_knots(
    breakpoints: &Array1<f64>,
    continuities: &Array1<i64>,
    order: usize,
) -> SplineResult<Array1<f64>> {
    if breakpoints.len() != continuities.len() {
        return Err(SplineError::DimensionMismatch(format!(
            "{} breakpoints but {} continuities",
            breakpoints.len(),
            continuities.len()
        )));
    }

    let mut knots_vec = Vec::new();
    for (&bp, &cont) in breakpoints.iter().zip(continuities.iter()) {
        let multiplicity = (order as i64 - cont).max(0) as usize;
        knots_vec.extend(std::iter::repeat(bp).take(multiplicity));
    }

    Ok(Array1::from(knots_vec))
}

/// Collapses a knot vector into breakpoints and continuities.
///
/// A new breakpoint starts whenever a knot exceeds the last recorded breakpoint
/// by more than `accuracy`. Every slot starts at continuity `order` and loses one
/// for each knot falling into it, so the continuity equals
/// `order - multiplicity`. Exact inverse of [`to_knots`] for the same order.
pub fn to_breakpoints(
    knots: &Array1<f64>,
    order: usize,
    accuracy: f64,
) -> (Array1<f64>, Array1<i64>) {
    let mut breakpoints: Vec<f64> = Vec::with_capacity(knots.len());
    let mut continuities: Vec<i64> = Vec::with_capacity(knots.len());

    for &knot in knots.iter() {
        match breakpoints.last() {
            Some(&last) if knot <= last + accuracy => {}
            _ => {
                breakpoints.push(knot);
                continuities.push(order as i64);
            }
        }
        if let Some(cont) = continuities.last_mut() {
            *cont -= 1;
        }
    }

    (Array1::from(breakpoints), Array1::from(continuities))
}

/// Merges two sorted knot vectors.
///
/// Knots closer than `accuracy` are emitted once and consume one knot of each
/// side, so the multiplicity of a shared location is the larger of the two.
/// Once one side is exhausted the rest of the other side is copied.
pub fn merge_knots(left: &Array1<f64>, right: &Array1<f64>, accuracy: f64) -> Array1<f64> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);

    while i < left.len() || j < right.len() {
        if i == left.len() {
            merged.push(right[j]);
            j += 1;
        } else if j == right.len() {
            merged.push(left[i]);
            i += 1;
        } else if left[i] < right[j] - accuracy {
            merged.push(left[i]);
            i += 1;
        } else if right[j] < left[i] - accuracy {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
            j += 1;
        }
    }

    trace!(
        "merged {} and {} knots into {}",
        left.len(),
        right.len(),
        merged.len()
    );
    Array1::from(merged)
}

/// Returns the sorted multiset union of `knots` and `new_knots`.
pub fn insert_knots(knots: &Array1<f64>, new_knots: &Array1<f64>) -> Array1<f64> {
    let mut all: Vec<f64> = knots.iter().chain(new_knots.iter()).copied().collect();
    all.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Array1::from(all)
}
