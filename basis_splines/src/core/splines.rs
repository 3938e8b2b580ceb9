use std::ops::Neg;
use std::sync::Arc;

use log::debug;
use ndarray::{s, Array1, Array2, Axis};

use crate::core::basis::{piece_samples, Basis};
use crate::core::error::{SplineError, SplineResult};
use crate::core::interpolate::Interpolate;
use crate::core::solver_interface::least_squares;

/// Piecewise polynomial `x -> B(x) * C`, the basis functions `B` weighted by
/// the rows of a coefficient matrix `C`.
///
/// Each column of `C` is one output dimension, so a spline with two columns is
/// a planar curve. The basis is shared and never modified through a spline;
/// every derived spline owns a freshly built basis.
#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    basis: Arc<Basis>,
    coefficients: Array2<f64>,
}

impl Spline {
    /// Creates a spline from a basis and a `dim(basis) x outputs` coefficient matrix.
    ///
    /// # Errors
    /// [`SplineError::DimensionMismatch`] if the row count differs from the basis dimension.
    pub fn new(basis: Arc<Basis>, coefficients: Array2<f64>) -> SplineResult<Self> {
        basis.check_rows(&coefficients)?;
        Ok(Self { basis, coefficients })
    }

    /// Creates a scalar spline from one coefficient per basis function.
    pub fn from_vector(basis: Arc<Basis>, coefficients: Array1<f64>) -> SplineResult<Self> {
        Self::new(basis, coefficients.insert_axis(Axis(1)))
    }

    pub fn basis(&self) -> &Arc<Basis> {
        &self.basis
    }

    pub fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }

    /// Number of output dimensions.
    pub fn dim(&self) -> usize {
        self.coefficients.ncols()
    }

    /// Values at `points`, one row per point and one column per output dimension.
    pub fn evaluate(&self, points: &Array1<f64>) -> Array2<f64> {
        self.basis.evaluate(points).dot(&self.coefficients)
    }

    /// The `order`-th derivative, on the basis with `order` knots removed at each end.
    pub fn derivative(&self, order: usize) -> SplineResult<Self> {
        let (basis, coefficients) = self.basis.derivative_coefficients(&self.coefficients, order)?;
        Self::new(Arc::new(basis), coefficients)
    }

    /// The `order`-th integral, zero at the first knot.
    pub fn integral(&self, order: usize) -> SplineResult<Self> {
        let (basis, coefficients) = self.basis.integral_coefficients(&self.coefficients, order)?;
        Self::new(Arc::new(basis), coefficients)
    }

    /// Pointwise sum, represented on the combination of both bases at the larger order.
    pub fn add(&self, other: &Spline) -> SplineResult<Self> {
        self.check_outputs(other)?;
        let order = self.basis.order().max(other.basis.order());
        self.combine_pointwise(other, order, |a, b| a + b)
    }

    /// Pointwise difference.
    pub fn sub(&self, other: &Spline) -> SplineResult<Self> {
        self.check_outputs(other)?;
        let order = self.basis.order().max(other.basis.order());
        self.combine_pointwise(other, order, |a, b| a - b)
    }

    /// Pointwise product of each output dimension, represented at order
    /// `order + other.order - 1`.
    pub fn prod(&self, other: &Spline) -> SplineResult<Self> {
        self.check_outputs(other)?;
        let order = self.basis.order() + other.basis.order() - 1;
        self.combine_pointwise(other, order, |a, b| a * b)
    }

    fn combine_pointwise<F>(&self, other: &Spline, order: usize, op: F) -> SplineResult<Self>
    where
        F: Fn(&Array2<f64>, &Array2<f64>) -> Array2<f64>,
    {
        let basis = self
            .basis
            .combine(&other.basis, order, self.basis.tolerances().knot)?;
        debug!("combined basis: order {}, {} functions", basis.order(), basis.dim());

        let sites = basis.sample_sites();
        let values = op(&self.evaluate(&sites), &other.evaluate(&sites));
        self.refit(basis, &values, &sites)
    }

    fn check_outputs(&self, other: &Spline) -> SplineResult<()> {
        if self.dim() != other.dim() {
            return Err(SplineError::DimensionMismatch(format!(
                "splines with {} and {} output dimensions",
                self.dim(),
                other.dim()
            )));
        }
        Ok(())
    }

    fn refit(&self, basis: Basis, values: &Array2<f64>, points: &Array1<f64>) -> SplineResult<Self> {
        let basis = Arc::new(basis);
        let coefficients = Interpolate::new(Arc::clone(&basis)).fit(values, points)?;
        Self::new(basis, coefficients)
    }

    /// Same function on a basis refined by `knots`.
    ///
    /// Coefficients are fitted to samples inside every piece of the refined basis.
    pub fn insert_knots(&self, knots: &Array1<f64>) -> SplineResult<Self> {
        self.refit_on(self.basis.insert_knots(knots)?)
    }

    /// Same function on a basis of order `order + n` with unchanged continuities.
    pub fn order_elevation(&self, n: usize) -> SplineResult<Self> {
        self.refit_on(self.basis.order_elevation(n)?)
    }

    fn refit_on(&self, basis: Basis) -> SplineResult<Self> {
        let sites = basis.sample_sites();
        let values = self.evaluate(&sites);
        self.refit(basis, &values, &sites)
    }

    /// Restriction to the polynomial pieces `first..=last`.
    ///
    /// When the segment basis functions are a subset of this spline's basis
    /// functions the coefficients are copied, otherwise they are fitted to
    /// samples inside the segment.
    pub fn segment(&self, first: usize, last: usize) -> SplineResult<Self> {
        let (basis, offset) = self.basis.segment_parts(first, last)?;
        if let Some(start) = offset {
            let coefficients = self.coefficients.slice(s![start..start + basis.dim(), ..]).to_owned();
            return Self::new(Arc::new(basis), coefficients);
        }

        let (bps, _) = self.basis.breakpoints();
        let points = piece_samples(&bps, first, last + 1, basis.order() + 1);

        let values = self.evaluate(&points);
        self.refit(basis, &values, &points)
    }

    /// Same function on the clamped version of its basis.
    ///
    /// The first and last coefficient rows are the values at the domain ends,
    /// the interior rows are fitted to samples inside every piece.
    pub fn clamped(&self) -> SplineResult<Self> {
        let basis = self.basis.clamped()?;
        let (left, right) = basis.domain();
        let dim = basis.dim();

        let ends = self.evaluate(&Array1::from(vec![left, right]));
        let mut coefficients = Array2::zeros((dim, self.dim()));
        coefficients.row_mut(0).assign(&ends.row(0));
        coefficients.row_mut(dim - 1).assign(&ends.row(1));

        if dim > 2 {
            let interior = basis.sample_sites();
            let design = basis.evaluate(&interior);

            let boundary = design.slice(s![.., 0..1]).dot(&ends.slice(s![0..1, ..]))
                + design.slice(s![.., dim - 1..dim]).dot(&ends.slice(s![1..2, ..]));
            let rhs = self.evaluate(&interior) - boundary;
            let inner = least_squares(&design.slice(s![.., 1..dim - 1]).to_owned(), &rhs)?;
            coefficients.slice_mut(s![1..dim - 1, ..]).assign(&inner);
        }

        Self::new(Arc::new(basis), coefficients)
    }
}

impl Neg for &Spline {
    type Output = Spline;

    fn neg(self) -> Spline {
        Spline {
            basis: Arc::clone(&self.basis),
            coefficients: -&self.coefficients,
        }
    }
}

impl Neg for Spline {
    type Output = Spline;

    fn neg(self) -> Spline {
        -&self
    }
}
