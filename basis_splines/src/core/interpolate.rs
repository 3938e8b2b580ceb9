//! Least-squares fitting of spline coefficients in a fixed basis.

use std::sync::Arc;

use ndarray::{Array1, Array2, Axis};

use crate::core::basis::Basis;
use crate::core::error::{SplineError, SplineResult};
use crate::core::solver_interface::least_squares;

/// Fits coefficients of a shared basis to sampled data.
#[derive(Debug, Clone)]
pub struct Interpolate {
    basis: Arc<Basis>,
}

impl Interpolate {
    pub fn new(basis: Arc<Basis>) -> Self {
        Self { basis }
    }

    pub fn basis(&self) -> &Arc<Basis> {
        &self.basis
    }

    /// Coefficients whose spline best matches `observations` at `points`.
    ///
    /// `observations` holds one row per point and one column per output
    /// dimension. With as many well placed points as basis functions the fit
    /// interpolates; otherwise the least-squares solution is returned.
    pub fn fit(&self, observations: &Array2<f64>, points: &Array1<f64>) -> SplineResult<Array2<f64>> {
        if observations.nrows() != points.len() {
            return Err(SplineError::DimensionMismatch(format!(
                "{} observations for {} points",
                observations.nrows(),
                points.len()
            )));
        }
        least_squares(&self.basis.evaluate(points), observations)
    }

    /// Samples `process` at the Greville sites of the basis and fits there.
    pub fn fit_process<F>(&self, process: F) -> SplineResult<Array2<f64>>
    where
        F: Fn(&Array1<f64>) -> Array2<f64>,
    {
        let sites = self.basis.greville();
        self.fit(&process(&sites), &sites)
    }

    /// Hermite fit from values and derivatives.
    ///
    /// `observations[i][j]` is the derivative of order `derivative_orders[i][j]`
    /// of the target function at `points[i]`. Every observation adds one row to
    /// the design matrix: the derivative basis evaluated at its point, mapped
    /// back onto this basis by the derivative transform.
    ///
    /// # Errors
    /// [`SplineError::DimensionMismatch`] if the three inputs disagree in length
    /// and [`SplineError::InvalidArgument`] for a derivative order not below the
    /// basis order.
    pub fn fit_hermite(
        &self,
        observations: &[Array1<f64>],
        derivative_orders: &[Vec<usize>],
        points: &Array1<f64>,
    ) -> SplineResult<Array1<f64>> {
        if observations.len() != points.len() || derivative_orders.len() != points.len() {
            return Err(SplineError::DimensionMismatch(format!(
                "{} observation groups and {} derivative order groups for {} points",
                observations.len(),
                derivative_orders.len(),
                points.len()
            )));
        }
        if let Some((i, _)) = observations
            .iter()
            .zip(derivative_orders)
            .enumerate()
            .find(|(_, (obs, orders))| obs.len() != orders.len())
        {
            return Err(SplineError::DimensionMismatch(format!(
                "observation group {} has {} values but {} derivative orders",
                i,
                observations[i].len(),
                derivative_orders[i].len()
            )));
        }

        let max_order = derivative_orders.iter().flatten().copied().max().unwrap_or(0);
        if max_order >= self.basis.order() {
            return Err(SplineError::InvalidArgument(format!(
                "derivative order {} is not below the basis order {}",
                max_order,
                self.basis.order()
            )));
        }
        let derivatives = (0..=max_order)
            .map(|r| self.basis.derivative(r))
            .collect::<SplineResult<Vec<_>>>()?;

        let num_rows: usize = observations.iter().map(|obs| obs.len()).sum();
        let mut design = Array2::zeros((num_rows, self.basis.dim()));
        let mut rhs = Array2::zeros((num_rows, 1));

        let mut row = 0;
        for ((obs, orders), &point) in observations.iter().zip(derivative_orders).zip(points.iter()) {
            let at = Array1::from_elem(1, point);
            for (&value, &r) in obs.iter().zip(orders.iter()) {
                let (basis, transform) = &derivatives[r];
                let values = basis.evaluate(&at).dot(transform);
                design.row_mut(row).assign(&values.index_axis(Axis(0), 0));
                rhs[[row, 0]] = value;
                row += 1;
            }
        }

        let coefficients = least_squares(&design, &rhs)?;
        Ok(coefficients.index_axis_move(Axis(1), 0))
    }
}
