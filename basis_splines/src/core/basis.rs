//! B-spline basis defined by a knot vector and an order.
//!
//! The basis owns every computation that only depends on the knots: evaluation
//! through the triangular Cox-de Boor recurrence, Greville sites, the
//! breakpoint/continuity representation and the construction of derived bases
//! (order change, combination, segments). Coefficient transforms between bases
//! live in [`crate::core::transform`].

use log::debug;
use ndarray::{s, Array1, Array2};

use crate::core::error::{SplineError, SplineResult};
use crate::core::knots;
use crate::core::tolerance::Tolerances;

/// Basis of piecewise polynomials of a fixed order.
///
/// `knots` is non-decreasing and holds `dim() + order()` values. Once wrapped
/// in an `Arc` and shared between splines a basis is treated as immutable; the
/// in-place setters need exclusive access.
#[derive(Debug, Clone, PartialEq)]
pub struct Basis {
    knots: Array1<f64>,
    order: usize,
    tolerances: Tolerances,
}

impl Basis {
    /// Creates a basis from its knots and order (degree + 1).
    ///
    /// # Errors
    /// Fails for order 0, for fewer than `order + 1` knots and for knot vectors
    /// that are not finite and non-decreasing.
    pub fn new(knots: Array1<f64>, order: usize) -> SplineResult<Self> {
        knots::validate_knots(&knots, order)?;
        Ok(Self {
            knots,
            order,
            tolerances: Tolerances::default(),
        })
    }

    /// Creates a basis from strictly increasing breakpoints and the continuity
    /// at each of them.
    ///
    /// # Errors
    /// [`SplineError::InvalidArgument`] if the breakpoints are not strictly
    /// increasing or a continuity lies outside `0..order`.
    pub fn from_breakpoints(
        breakpoints: &Array1<f64>,
        continuities: &Array1<i64>,
        order: usize,
    ) -> SplineResult<Self> {
        if order == 0 {
            return Err(SplineError::InvalidOrder(order));
        }
        let tolerances = Tolerances::default();
        validate_breakpoints(breakpoints, tolerances.knot)?;
        validate_continuities(continuities, order)?;
        let knots = knots::to_knots(breakpoints, continuities, order)?;
        Self::new(knots, order)
    }

    /// Clamped basis over `[x_min, x_max]` with uniformly spaced simple interior knots.
    pub fn uniform(
        x_min: f64,
        x_max: f64,
        num_internal_knots: usize,
        order: usize,
    ) -> SplineResult<Self> {
        let knots = knots::generate_uniform_knots(x_min, x_max, num_internal_knots, order)?;
        Self::new(knots, order)
    }

    /// Replaces the comparison bands of this basis.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Basis sharing this basis' tolerances. `knots` must already be valid for `order`.
    pub(crate) fn derived(&self, knots: Array1<f64>, order: usize) -> Self {
        Self {
            knots,
            order,
            tolerances: self.tolerances,
        }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Number of basis functions.
    pub fn dim(&self) -> usize {
        self.knots.len() - self.order
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn knots(&self) -> &Array1<f64> {
        &self.knots
    }

    /// Interval `[t_{order-1}, t_dim]` on which the basis is complete.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.order - 1], self.knots[self.dim()])
    }

    /// Evaluates every basis function at every point.
    ///
    /// Returns a `points.len() x dim()` matrix. Order-1 values are indicators of
    /// the half-open intervals `(t_i, t_{i+1}]`; the intervals touching the first
    /// and last knot are closed towards the boundary (with the domain
    /// tolerance) so points on the domain ends evaluate correctly. Higher orders
    /// blend neighbouring values with the weights
    /// `(x - t_i) / (t_{i+o-1} - t_i)` and `(t_{i+o} - x) / (t_{i+o} - t_{i+1})`,
    /// dropping a weight whose denominator falls below the denominator tolerance.
    ///
    /// At order 1 the rows sum to one only for simple boundary knots: a point on
    /// a repeated first knot lights every zero-width interval at that knot.
    pub fn evaluate(&self, points: &Array1<f64>) -> Array2<f64> {
        let t = &self.knots;
        let n = t.len();
        let dim = self.dim();
        let den_tol = self.tolerances.denominator;

        let mut values = Array2::zeros((points.len(), dim));
        let mut table = vec![0.0; n - 1];

        for (row, &x) in points.iter().enumerate() {
            for (i, value) in table.iter_mut().enumerate() {
                *value = if self.in_knot_segment(t[i], t[i + 1], x) { 1.0 } else { 0.0 };
            }

            // Ascending in-place update: table[i + 1] still holds the lower order value.
            for o in 2..=self.order {
                for i in 0..(n - o) {
                    let den_l = t[i + o - 1] - t[i];
                    let weight_l = if den_l.abs() > den_tol { (x - t[i]) / den_l } else { 0.0 };
                    let den_r = t[i + o] - t[i + 1];
                    let weight_r = if den_r.abs() > den_tol { (t[i + o] - x) / den_r } else { 0.0 };
                    table[i] = weight_l * table[i] + weight_r * table[i + 1];
                }
            }

            for (j, &value) in table.iter().take(dim).enumerate() {
                values[[row, j]] = value;
            }
        }

        values
    }

    fn in_knot_segment(&self, left: f64, right: f64, x: f64) -> bool {
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        let acc = self.tolerances.domain;
        let upper = if right == last { right + acc } else { right };

        if left == first {
            x >= left - acc && x <= upper
        } else {
            x > left && x <= upper
        }
    }

    /// Greville sites, the knot averages associated with each coefficient.
    ///
    /// For order 1 the sites coincide with the segment boundaries, so all
    /// `dim() + 1` knots are returned.
    pub fn greville(&self) -> Array1<f64> {
        if self.order == 1 {
            return self.knots.clone();
        }
        Array1::from_iter((0..self.dim()).map(|i| self.greville_average(i)))
    }

    /// Greville site of the basis function at `index`, `None` if out of range.
    pub fn greville_site(&self, index: usize) -> Option<f64> {
        if self.order == 1 {
            return self.knots.get(index).copied();
        }
        (index < self.dim()).then(|| self.greville_average(index))
    }

    fn greville_average(&self, index: usize) -> f64 {
        let window = self.knots.slice(s![index + 1..index + self.order]);
        window.sum() / (self.order - 1) as f64
    }

    /// Points strictly inside every polynomial piece, `order + 1` per piece.
    ///
    /// Unlike the Greville sites these never coincide and never sit on a
    /// breakpoint, so a least-squares fit on them recovers any function of the
    /// basis, including across breakpoints of full multiplicity.
    pub fn sample_sites(&self) -> Array1<f64> {
        let (bps, _) = self.breakpoints();
        piece_samples(&bps, 0, bps.len().saturating_sub(1), self.order + 1)
    }

    /// Breakpoints and the continuity at each of them, using the knot tolerance.
    pub fn breakpoints(&self) -> (Array1<f64>, Array1<i64>) {
        self.breakpoints_with_accuracy(self.tolerances.knot)
    }

    pub fn breakpoints_with_accuracy(&self, accuracy: f64) -> (Array1<f64>, Array1<i64>) {
        knots::to_breakpoints(&self.knots, self.order, accuracy)
    }

    /// Knot vector for the given breakpoints, continuities and order.
    pub fn to_knots(
        breakpoints: &Array1<f64>,
        continuities: &Array1<i64>,
        order: usize,
    ) -> SplineResult<Array1<f64>> {
        knots::to_knots(breakpoints, continuities, order)
    }

    /// Moves the breakpoints at `indices` to `values` and rebuilds the knots.
    ///
    /// `dim()` may change, so coefficients built for the old basis are stale.
    ///
    /// # Errors
    /// [`SplineError::InvalidArgument`] if the arguments differ in length, an
    /// index is out of range or the edited breakpoints are not strictly
    /// increasing. The basis is unchanged on error.
    pub fn set_breakpoints(&mut self, values: &Array1<f64>, indices: &[usize]) -> SplineResult<()> {
        let (mut bps, conts) = self.breakpoints();
        overwrite(&mut bps, values, indices)?;
        validate_breakpoints(&bps, self.tolerances.knot)?;
        self.knots = knots::to_knots(&bps, &conts, self.order)?;
        debug!("breakpoints edited, basis now has {} functions", self.dim());
        Ok(())
    }

    /// Sets the continuities at the breakpoints `indices` and rebuilds the knots.
    ///
    /// # Errors
    /// [`SplineError::InvalidArgument`] if the arguments differ in length, an
    /// index is out of range, or any continuity lies outside `0..order`. The basis
    /// is unchanged on error.
    pub fn set_continuities(&mut self, values: &Array1<i64>, indices: &[usize]) -> SplineResult<()> {
        let (bps, mut conts) = self.breakpoints();
        overwrite(&mut conts, values, indices)?;
        validate_continuities(&conts, self.order)?;
        let new_knots = knots::to_knots(&bps, &conts, self.order)?;
        if new_knots.len() < self.order + 1 {
            return Err(SplineError::InvalidArgument(format!(
                "continuities leave only {} knots for order {}",
                new_knots.len(),
                self.order
            )));
        }
        self.knots = new_knots;
        debug!("continuities edited, basis now has {} functions", self.dim());
        Ok(())
    }

    /// Copy of this basis with edited breakpoints, see [`Basis::set_breakpoints`].
    pub fn with_breakpoints(&self, values: &Array1<f64>, indices: &[usize]) -> SplineResult<Self> {
        let mut basis = self.clone();
        basis.set_breakpoints(values, indices)?;
        Ok(basis)
    }

    /// Copy of this basis with edited continuities, see [`Basis::set_continuities`].
    pub fn with_continuities(&self, values: &Array1<i64>, indices: &[usize]) -> SplineResult<Self> {
        let mut basis = self.clone();
        basis.set_continuities(values, indices)?;
        Ok(basis)
    }

    /// Basis able to represent every function of this and `other` basis at
    /// `target_order`.
    ///
    /// Both knot vectors are re-expanded to `target_order` keeping the
    /// continuity of each breakpoint and then merged, knots closer than
    /// `accuracy` counting as shared.
    pub fn combine(&self, other: &Basis, target_order: usize, accuracy: f64) -> SplineResult<Self> {
        let min_order = self.order.max(other.order);
        if target_order < min_order {
            return Err(SplineError::InvalidArgument(format!(
                "target order {} is below the operand order {}",
                target_order, min_order
            )));
        }

        let (bps_l, conts_l) = self.breakpoints_with_accuracy(accuracy);
        let (bps_r, conts_r) = other.breakpoints_with_accuracy(accuracy);
        let knots_l = knots::to_knots(&bps_l, &conts_l, target_order)?;
        let knots_r = knots::to_knots(&bps_r, &conts_r, target_order)?;

        let merged = knots::merge_knots(&knots_l, &knots_r, accuracy);
        knots::validate_knots(&merged, target_order)?;
        Ok(self.derived(merged, target_order))
    }

    /// Removes `n` knots at each end and lowers the order by `n`.
    ///
    /// This is the basis of the `n`-th derivative.
    pub fn order_decrease(&self, n: usize) -> SplineResult<Self> {
        if n == 0 {
            return Ok(self.clone());
        }
        if n >= self.order || n >= self.dim() {
            return Err(SplineError::OrderReduction {
                order: self.order,
                requested: n,
            });
        }
        let len = self.knots.len();
        let knots = self.knots.slice(s![n..len - n]).to_owned();
        Ok(self.derived(knots, self.order - n))
    }

    /// Repeats the first and last knot `n` more times and raises the order by `n`.
    ///
    /// This is the basis of the `n`-th integral.
    pub fn order_increase(&self, n: usize) -> Self {
        if n == 0 {
            return self.clone();
        }
        let first = self.knots[0];
        let last = self.knots[self.knots.len() - 1];
        let knots: Vec<f64> = std::iter::repeat(first)
            .take(n)
            .chain(self.knots.iter().copied())
            .chain(std::iter::repeat(last).take(n))
            .collect();
        self.derived(Array1::from(knots), self.order + n)
    }

    /// Raises the order by `n` while keeping the continuity at every breakpoint.
    pub fn order_elevation(&self, n: usize) -> SplineResult<Self> {
        let (bps, conts) = self.breakpoints();
        let knots = knots::to_knots(&bps, &conts, self.order + n)?;
        Ok(self.derived(knots, self.order + n))
    }

    /// Basis with `new_knots` added to the knot vector, same order.
    pub fn insert_knots(&self, new_knots: &Array1<f64>) -> SplineResult<Self> {
        let knots = knots::insert_knots(&self.knots, new_knots);
        knots::validate_knots(&knots, self.order)?;
        Ok(self.derived(knots, self.order))
    }

    /// Basis of the functions active on the polynomial pieces `first..=last`.
    ///
    /// Piece `i` spans the breakpoints `i` and `i + 1`. The returned knots hold
    /// exactly `order` knots at or before the left end of the segment and
    /// `order` knots at or after its right end.
    pub fn segment(&self, first: usize, last: usize) -> SplineResult<Self> {
        self.segment_parts(first, last).map(|(basis, _)| basis)
    }

    /// Segment basis plus the index of its first function in this basis when
    /// the segment functions are a contiguous subset of this basis' functions.
    pub(crate) fn segment_parts(&self, first: usize, last: usize) -> SplineResult<(Self, Option<usize>)> {
        let (bps, _) = self.breakpoints();
        let pieces = bps.len().saturating_sub(1);
        if first > last || last >= pieces {
            return Err(SplineError::InvalidArgument(format!(
                "segment {}..={} is not within the {} pieces of the basis",
                first, last, pieces
            )));
        }

        let (left, right) = (bps[first], bps[last + 1]);
        let tol = self.tolerances.knot;
        let t = &self.knots;
        let n = t.len();

        // Last knot at the left end and first knot at the right end of the segment.
        let mu = (0..n).rev().find(|&i| t[i] <= left + tol).unwrap_or(0);
        let nu = (0..n).find(|&i| t[i] >= right - tol).unwrap_or(n - 1);

        let start = mu as isize + 1 - self.order as isize;
        let end = nu + self.order - 1;
        let front_pad = (-start).max(0) as usize;
        let back_pad = end.saturating_sub(n - 1);
        let start = start.max(0) as usize;
        let end = end.min(n - 1);

        let knots: Vec<f64> = std::iter::repeat(t[0])
            .take(front_pad)
            .chain(t.slice(s![start..=end]).iter().copied())
            .chain(std::iter::repeat(t[n - 1]).take(back_pad))
            .collect();

        let exact = (front_pad == 0 && back_pad == 0).then_some(start);
        Ok((self.derived(Array1::from(knots), self.order), exact))
    }

    /// Equivalent basis clamped at the ends of [`Basis::domain`].
    ///
    /// # Errors
    /// [`SplineError::InvalidArgument`] if the domain has zero width.
    pub fn clamped(&self) -> SplineResult<Self> {
        let (left, right) = self.domain();
        let tol = self.tolerances.knot;
        if right - left <= tol {
            return Err(SplineError::InvalidArgument(format!(
                "cannot clamp a basis on the degenerate domain [{}, {}]",
                left, right
            )));
        }

        let interior = self
            .knots
            .slice(s![self.order..self.dim()])
            .iter()
            .copied()
            .filter(|&k| k > left + tol && k < right - tol)
            .collect::<Vec<_>>();
        let knots: Vec<f64> = std::iter::repeat(left)
            .take(self.order)
            .chain(interior)
            .chain(std::iter::repeat(right).take(self.order))
            .collect();
        Ok(self.derived(Array1::from(knots), self.order))
    }
}

/// `per_piece` equally spaced points strictly inside each of the pieces
/// `first..end` spanned by `breakpoints`.
pub(crate) fn piece_samples(breakpoints: &Array1<f64>, first: usize, end: usize, per_piece: usize) -> Array1<f64> {
    let step = 1.0 / (per_piece + 1) as f64;
    (first..end)
        .flat_map(|piece| {
            let (left, right) = (breakpoints[piece], breakpoints[piece + 1]);
            (1..=per_piece).map(move |j| left + j as f64 * step * (right - left))
        })
        .collect()
}

fn overwrite<T: Copy>(target: &mut Array1<T>, values: &Array1<T>, indices: &[usize]) -> SplineResult<()> {
    if values.len() != indices.len() {
        return Err(SplineError::InvalidArgument(format!(
            "{} values given for {} indices",
            values.len(),
            indices.len()
        )));
    }
    if let Some(&idx) = indices.iter().find(|&&idx| idx >= target.len()) {
        return Err(SplineError::InvalidArgument(format!(
            "index {} out of range for {} breakpoints",
            idx,
            target.len()
        )));
    }
    for (&idx, &value) in indices.iter().zip(values.iter()) {
        target[idx] = value;
    }
    Ok(())
}

fn validate_breakpoints(breakpoints: &Array1<f64>, tolerance: f64) -> SplineResult<()> {
    if breakpoints.len() < 2 {
        return Err(SplineError::InvalidArgument(format!(
            "at least 2 breakpoints are required, got {}",
            breakpoints.len()
        )));
    }
    for i in 0..breakpoints.len() - 1 {
        if !(breakpoints[i + 1] - breakpoints[i] > tolerance) {
            return Err(SplineError::InvalidArgument(format!(
                "breakpoints must be strictly increasing: b_{}={} >= b_{}={}",
                i,
                breakpoints[i],
                i + 1,
                breakpoints[i + 1]
            )));
        }
    }
    Ok(())
}

fn validate_continuities(continuities: &Array1<i64>, order: usize) -> SplineResult<()> {
    let max = order as i64 - 1;
    if let Some((idx, &cont)) = continuities
        .iter()
        .enumerate()
        .find(|&(_, &cont)| cont < 0 || cont > max)
    {
        return Err(SplineError::InvalidArgument(format!(
            "continuity {} at breakpoint {} is outside 0..={}",
            cont, idx, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    const TOL: f64 = 1e-10;

    fn assert_arr_eq(a: &Array1<f64>, b: &Array1<f64>, tol: f64) {
        assert_eq!(a.len(), b.len(), "Array lengths differ: {:?} vs {:?}", a, b);
        for (i, (val_a, val_b)) in a.iter().zip(b.iter()).enumerate() {
            assert!((val_a - val_b).abs() < tol, "Mismatch at index {}: {} vs {}", i, val_a, val_b);
        }
    }

    fn assert_mat_eq(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim(), "Matrix shapes differ");
        for ((idx, val_a), val_b) in a.indexed_iter().zip(b.iter()) {
            assert!((val_a - val_b).abs() < tol, "Mismatch at {:?}: {} vs {}", idx, val_a, val_b);
        }
    }

    fn knots_o3() -> Array1<f64> {
        arr1(&[0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0])
    }

    #[test]
    fn test_new_rejects_invalid_input() {
        assert_eq!(Basis::new(knots_o3(), 0), Err(SplineError::InvalidOrder(0)));
        assert!(matches!(
            Basis::new(arr1(&[0.0, 1.0]), 2),
            Err(SplineError::InsufficientKnots { .. })
        ));
        assert!(Basis::new(arr1(&[0.0, 1.0, 0.5]), 1).is_err());
    }

    #[test]
    fn test_dim_and_domain() {
        let basis = Basis::new(knots_o3(), 3).unwrap();
        assert_eq!(basis.dim(), 5);
        assert_eq!(basis.order(), 3);
        assert_eq!(basis.domain(), (0.0, 1.0));
    }

    #[test]
    fn test_evaluate_order1() {
        let basis = Basis::new(knots_o3(), 1).unwrap();
        let values = basis.evaluate(&arr1(&[0.0, 0.75]));

        // The zero-width intervals at the left boundary include the boundary point.
        let expected = arr2(&[
            [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        ]);
        assert_mat_eq(&values, &expected, TOL);
    }

    #[test]
    fn test_evaluate_order2() {
        let basis = Basis::new(knots_o3(), 2).unwrap();
        let values = basis.evaluate(&arr1(&[0.1, 0.75]));
        let expected = arr2(&[
            [0.0, 0.8, 0.2, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.5, 0.5, 0.0],
        ]);
        assert_mat_eq(&values, &expected, TOL);
    }

    #[test]
    fn test_evaluate_order3() {
        let basis = Basis::new(knots_o3(), 3).unwrap();
        let values = basis.evaluate(&arr1(&[0.0, 0.25, 0.5, 0.75, 1.0]));
        // On [0, 0.5] the basis is the Bernstein basis in u = 2x,
        // on [0.5, 1] in u = 2x - 1.
        let expected = arr2(&[
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.25, 0.5, 0.25, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.25, 0.5, 0.25],
            [0.0, 0.0, 0.0, 0.0, 1.0],
        ]);
        assert_mat_eq(&values, &expected, TOL);
    }

    #[test]
    fn test_evaluate_book_example_uniform_knots() {
        // "A Practical Guide to Splines", quadratic B-splines on t_i = i.
        let basis = Basis::new(arr1(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]), 3).unwrap();
        let values = basis.evaluate(&arr1(&[0.5, 1.5, 2.0, 2.5]));
        assert_abs_diff_eq!(values[[0, 0]], 0.125, epsilon = TOL);
        assert_abs_diff_eq!(values[[1, 0]], 0.75, epsilon = TOL);
        assert_abs_diff_eq!(values[[2, 0]], 0.5, epsilon = TOL);
        assert_abs_diff_eq!(values[[2, 1]], 0.5, epsilon = TOL);
        assert_abs_diff_eq!(values[[2, 2]], 0.0, epsilon = TOL);
        assert_abs_diff_eq!(values[[3, 0]], 0.125, epsilon = TOL);
        assert_abs_diff_eq!(values[[3, 1]], 0.75, epsilon = TOL);
        assert_abs_diff_eq!(values[[3, 2]], 0.125, epsilon = TOL);
    }

    #[test]
    fn test_evaluate_outside_domain_is_zero() {
        let basis = Basis::new(knots_o3(), 3).unwrap();
        let values = basis.evaluate(&arr1(&[-0.1, 1.1]));
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_partition_of_unity() {
        let points = Array1::linspace(0.0, 1.0, 41);
        for order in 1..=5 {
            let basis = Basis::uniform(0.0, 1.0, 4, order).unwrap();
            let values = basis.evaluate(&points);
            for (row, sum) in values.sum_axis(ndarray::Axis(1)).iter().enumerate() {
                assert!((sum - 1.0).abs() < 1e-12, "order {} point {}: sum {}", order, points[row], sum);
            }
        }
    }

    #[test]
    fn test_partition_of_unity_discontinuous_knots() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.4, 0.7, 0.7, 0.7, 1.0, 1.0, 1.0]), 3).unwrap();
        let values = basis.evaluate(&Array1::linspace(0.0, 1.0, 23));
        for sum in values.sum_axis(ndarray::Axis(1)).iter() {
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sample_sites_inside_pieces() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.4, 0.7, 0.7, 1.0, 1.0]), 2).unwrap();
        let sites = basis.sample_sites();
        assert_eq!(sites.len(), 3 * 3);
        assert_abs_diff_eq!(sites[0], 0.1, epsilon = TOL);
        assert_abs_diff_eq!(sites[3], 0.475, epsilon = TOL);
        assert_abs_diff_eq!(sites[8], 0.925, epsilon = TOL);
        let (bps, _) = basis.breakpoints();
        assert!(sites.iter().all(|x| bps.iter().all(|bp| (x - bp).abs() > 1e-3)));

        // A fit on the Greville sites loses rank at the full-multiplicity knot.
        let greville = basis.greville();
        assert_abs_diff_eq!(greville[2], greville[3], epsilon = TOL);
    }

    #[test]
    fn test_greville_order1_equals_knots() {
        let basis = Basis::new(knots_o3(), 1).unwrap();
        assert_eq!(basis.greville(), knots_o3());
        assert_eq!(basis.greville_site(3), Some(0.5));
    }

    #[test]
    fn test_greville_order2() {
        let basis = Basis::new(knots_o3(), 2).unwrap();
        assert_arr_eq(&basis.greville(), &arr1(&[0.0, 0.0, 0.5, 0.5, 1.0, 1.0]), TOL);
    }

    #[test]
    fn test_greville_order4() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.0, 0.3, 0.7, 1.0, 1.0, 1.0, 1.0]), 4).unwrap();
        let expected = arr1(&[0.0, 0.1, 1.0 / 3.0, 2.0 / 3.0, 0.9, 1.0]);
        let greville = basis.greville();
        assert_eq!(greville.len(), basis.dim());
        assert_arr_eq(&greville, &expected, TOL);
        for (i, &site) in expected.iter().enumerate() {
            assert_abs_diff_eq!(basis.greville_site(i).unwrap(), site, epsilon = TOL);
        }
        assert_eq!(basis.greville_site(6), None);
    }

    #[test]
    fn test_breakpoints_and_round_trip() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.4, 0.7, 0.7, 1.0, 1.0, 1.0]), 3).unwrap();
        let (bps, conts) = basis.breakpoints();
        assert_arr_eq(&bps, &arr1(&[0.0, 0.4, 0.7, 1.0]), TOL);
        assert_eq!(conts, arr1(&[0, 2, 1, 0]));
        assert_eq!(&Basis::to_knots(&bps, &conts, 3).unwrap(), basis.knots());
    }

    #[test]
    fn test_from_breakpoints() {
        let basis = Basis::from_breakpoints(&arr1(&[0.0, 0.5, 1.0]), &arr1(&[0, 1, 0]), 3).unwrap();
        assert_eq!(basis.knots(), &knots_o3());

        let err = Basis::from_breakpoints(&arr1(&[0.0, 0.5, 0.5]), &arr1(&[0, 1, 0]), 3);
        assert!(matches!(err, Err(SplineError::InvalidArgument(_))));
        let err = Basis::from_breakpoints(&arr1(&[0.0, 0.5, 1.0]), &arr1(&[0, 3, 0]), 3);
        assert!(matches!(err, Err(SplineError::InvalidArgument(_))));
    }

    #[test]
    fn test_set_breakpoints_valid() {
        let mut basis = Basis::new(knots_o3(), 3).unwrap();
        basis.set_breakpoints(&arr1(&[-0.5, 0.25]), &[0, 1]).unwrap();
        let (bps, conts) = basis.breakpoints();
        assert_arr_eq(&bps, &arr1(&[-0.5, 0.25, 1.0]), TOL);
        assert_eq!(conts, arr1(&[0, 1, 0]));
        assert_arr_eq(
            basis.knots(),
            &arr1(&[-0.5, -0.5, -0.5, 0.25, 0.25, 1.0, 1.0, 1.0]),
            TOL,
        );
    }

    #[test]
    fn test_set_breakpoints_not_increasing_leaves_basis_unchanged() {
        let mut basis = Basis::new(knots_o3(), 3).unwrap();
        let before = basis.clone();

        let result = basis.set_breakpoints(&arr1(&[0.6, 0.5]), &[0, 1]);
        assert!(matches!(result, Err(SplineError::InvalidArgument(_))));
        assert_eq!(basis, before);

        let result = basis.set_breakpoints(&arr1(&[1.0]), &[1]);
        assert!(matches!(result, Err(SplineError::InvalidArgument(_))));
        assert_eq!(basis, before);
    }

    #[test]
    fn test_set_breakpoints_bad_indices() {
        let mut basis = Basis::new(knots_o3(), 3).unwrap();
        assert!(basis.set_breakpoints(&arr1(&[0.1]), &[5]).is_err());
        assert!(basis.set_breakpoints(&arr1(&[0.1, 0.2]), &[1]).is_err());
        assert_eq!(basis.knots(), &knots_o3());
    }

    #[test]
    fn test_set_continuities_changes_dim() {
        let mut basis = Basis::new(knots_o3(), 3).unwrap();
        basis.set_continuities(&arr1(&[2]), &[1]).unwrap();
        let (_, conts) = basis.breakpoints();
        assert_eq!(conts, arr1(&[0, 2, 0]));
        assert_eq!(basis.dim(), 4);
        assert_arr_eq(basis.knots(), &arr1(&[0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]), TOL);
    }

    #[test]
    fn test_set_continuities_out_of_range_leaves_basis_unchanged() {
        let mut basis = Basis::new(knots_o3(), 3).unwrap();
        let before = basis.clone();

        assert!(matches!(
            basis.set_continuities(&arr1(&[-1]), &[1]),
            Err(SplineError::InvalidArgument(_))
        ));
        assert_eq!(basis, before);

        assert!(matches!(
            basis.set_continuities(&arr1(&[3]), &[1]),
            Err(SplineError::InvalidArgument(_))
        ));
        assert_eq!(basis, before);
        assert_eq!(basis.breakpoints().1, arr1(&[0, 1, 0]));
    }

    #[test]
    fn test_with_breakpoints_does_not_touch_source() {
        let basis = Basis::new(knots_o3(), 3).unwrap();
        let moved = basis.with_breakpoints(&arr1(&[0.3]), &[1]).unwrap();
        assert_eq!(basis.knots(), &knots_o3());
        assert_abs_diff_eq!(moved.knots()[3], 0.3, epsilon = TOL);
    }

    #[test]
    fn test_combine_same_order() {
        let left = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]), 3).unwrap();
        let right = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.25, 0.5, 0.8, 1.0, 1.0, 1.0]), 3).unwrap();
        let combined = left.combine(&right, 3, 1e-6).unwrap();
        assert_eq!(combined.order(), 3);
        assert_arr_eq(
            combined.knots(),
            &arr1(&[0.0, 0.0, 0.0, 0.25, 0.5, 0.8, 1.0, 1.0, 1.0]),
            TOL,
        );
    }

    #[test]
    fn test_combine_elevates_order_keeping_continuity() {
        let left = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.4, 0.7, 0.7, 1.0, 1.0, 1.0]), 3).unwrap();
        let right = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.0, 0.2, 0.2, 1.0, 1.0, 1.0, 1.0]), 4).unwrap();
        let combined = left.combine(&right, 6, 1e-6).unwrap();
        let (bps, conts) = combined.breakpoints();
        assert_arr_eq(&bps, &arr1(&[0.0, 0.2, 0.4, 0.7, 1.0]), TOL);
        // Continuities 2 at 0.2 (order 4), 2 at 0.4 and 1 at 0.7 (order 3).
        assert_eq!(conts, arr1(&[0, 2, 2, 1, 0]));
        assert!(left.combine(&right, 3, 1e-6).is_err());
    }

    #[test]
    fn test_order_decrease_and_increase() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]), 3).unwrap();

        let lower = basis.order_decrease(1).unwrap();
        assert_eq!(lower.order(), 2);
        assert_arr_eq(lower.knots(), &arr1(&[0.0, 0.0, 0.5, 1.0, 1.0]), TOL);

        let higher = basis.order_increase(1);
        assert_eq!(higher.order(), 4);
        assert_arr_eq(higher.knots(), &arr1(&[0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0]), TOL);

        assert_eq!(basis.order_decrease(0).unwrap(), basis);
        assert_eq!(basis.order_increase(0), basis);
        assert_eq!(basis.order_increase(2).order_decrease(2).unwrap(), basis);
        assert_eq!(
            basis.order_decrease(2).unwrap(),
            lower.order_decrease(1).unwrap()
        );
        assert!(matches!(
            basis.order_decrease(3),
            Err(SplineError::OrderReduction { order: 3, requested: 3 })
        ));
    }

    #[test]
    fn test_order_elevation_keeps_continuity() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.4, 0.7, 0.7, 1.0, 1.0, 1.0]), 3).unwrap();
        let elevated = basis.order_elevation(2).unwrap();
        assert_eq!(elevated.order(), 5);
        assert_eq!(elevated.breakpoints().1, arr1(&[0, 2, 1, 0]));
        // Two extra functions per polynomial piece.
        assert_eq!(elevated.dim(), basis.dim() + 2 * 3);
    }

    #[test]
    fn test_insert_knots() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]), 3).unwrap();
        let refined = basis.insert_knots(&arr1(&[0.6, 0.4])).unwrap();
        assert_arr_eq(
            refined.knots(),
            &arr1(&[0.0, 0.0, 0.0, 0.4, 0.5, 0.6, 1.0, 1.0, 1.0]),
            TOL,
        );
        assert_eq!(refined.order(), 3);
    }

    #[test]
    fn test_segment_first_pieces() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0]), 3).unwrap();
        let (segment, offset) = basis.segment_parts(0, 1).unwrap();
        assert_arr_eq(segment.knots(), &arr1(&[0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0]), TOL);
        assert_eq!(offset, Some(0));
        assert_eq!(segment.dim(), 4);
    }

    #[test]
    fn test_segment_last_pieces() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0]), 3).unwrap();
        let (segment, offset) = basis.segment_parts(1, 2).unwrap();
        assert_arr_eq(segment.knots(), &arr1(&[0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0]), TOL);
        assert_eq!(offset, Some(1));
        let (bps, _) = segment.breakpoints();
        assert_abs_diff_eq!(bps[1], 0.3, epsilon = TOL);
        assert_abs_diff_eq!(bps[3], 1.0, epsilon = TOL);
    }

    #[test]
    fn test_segment_pads_short_knot_vectors() {
        let basis = Basis::new(arr1(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]), 3).unwrap();
        let (segment, offset) = basis.segment_parts(0, 0).unwrap();
        assert_eq!(offset, None);
        assert_arr_eq(segment.knots(), &arr1(&[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]), TOL);
    }

    #[test]
    fn test_segment_invalid_indices() {
        let basis = Basis::new(knots_o3(), 3).unwrap();
        assert!(matches!(basis.segment(1, 0), Err(SplineError::InvalidArgument(_))));
        assert!(matches!(basis.segment(0, 2), Err(SplineError::InvalidArgument(_))));
    }

    #[test]
    fn test_clamped() {
        let basis = Basis::new(arr1(&[0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0]), 3).unwrap();
        let clamped = basis.clamped().unwrap();
        assert_arr_eq(clamped.knots(), &arr1(&[0.3, 0.3, 0.3, 0.6, 1.0, 1.0, 1.0]), TOL);
        assert_eq!(clamped.dim(), basis.dim());

        let already = Basis::new(knots_o3(), 3).unwrap();
        assert_eq!(already.clamped().unwrap(), already);
    }

    #[test]
    fn test_tolerances_are_inherited() {
        let tolerances = Tolerances::uniform(1e-3);
        let basis = Basis::new(knots_o3(), 3).unwrap().with_tolerances(tolerances);
        assert_eq!(basis.order_increase(1).tolerances(), &tolerances);
        assert_eq!(basis.order_decrease(1).unwrap().tolerances(), &tolerances);
        assert_eq!(basis.clamped().unwrap().tolerances(), &tolerances);
    }
}
