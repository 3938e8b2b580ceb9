//! Linear maps between the coefficients of a basis and the coefficients of
//! its derivative, integral, sum and product bases.

use log::debug;
use ndarray::{Array2, Axis};

use crate::core::basis::Basis;
use crate::core::error::{SplineError, SplineResult};
use crate::core::math::khatri_rao;
use crate::core::solver_interface::least_squares;

impl Basis {
    /// Transform from coefficients in this basis to the coefficients of the
    /// `order`-th derivative.
    ///
    /// Returns the derivative basis (this basis with `order` knots stripped at
    /// each end) and a `(dim - order) x dim` matrix. Order 0 gives the identity.
    ///
    /// # Errors
    /// [`SplineError::OrderReduction`] if the basis order or dimension is too
    /// small to differentiate `order` times.
    pub fn derivative(&self, order: usize) -> SplineResult<(Basis, Array2<f64>)> {
        let mut basis = self.clone();
        let mut transform = Array2::<f64>::eye(self.dim());
        for _ in 0..order {
            let (next, step) = basis.derivative_step()?;
            transform = step.dot(&transform);
            basis = next;
        }
        Ok((basis, transform))
    }

    fn derivative_step(&self) -> SplineResult<(Basis, Array2<f64>)> {
        let out = self.order_decrease(1)?;
        let t = self.knots();
        let o = self.order();
        let scale = (o - 1) as f64;

        let mut step = Array2::zeros((out.dim(), self.dim()));
        for i in 0..out.dim() {
            let den = t[i + o] - t[i + 1];
            if den.abs() > self.tolerances().denominator {
                step[[i, i]] = -scale / den;
                step[[i, i + 1]] = scale / den;
            }
        }
        Ok((out, step))
    }

    /// Applies the `order`-th derivative directly to a coefficient matrix.
    ///
    /// Same result as multiplying with the matrix from [`Basis::derivative`],
    /// computed with differences of neighbouring coefficient rows.
    pub fn derivative_coefficients(
        &self,
        coefficients: &Array2<f64>,
        order: usize,
    ) -> SplineResult<(Basis, Array2<f64>)> {
        self.check_rows(coefficients)?;
        let mut basis = self.clone();
        let mut values = coefficients.clone();

        for _ in 0..order {
            let out = basis.order_decrease(1)?;
            let t = basis.knots();
            let o = basis.order();
            let den_tol = basis.tolerances().denominator;

            let mut next = Array2::zeros((out.dim(), values.ncols()));
            for (i, mut row) in next.axis_iter_mut(Axis(0)).enumerate() {
                let den = t[i + o] - t[i + 1];
                if den.abs() > den_tol {
                    let diff = &values.row(i + 1) - &values.row(i);
                    row.assign(&(diff * ((o - 1) as f64 / den)));
                }
            }
            values = next;
            basis = out;
        }

        Ok((basis, values))
    }

    /// Transform from coefficients in this basis to the coefficients of the
    /// `order`-th integral.
    ///
    /// The integral basis repeats the boundary knots `order` more times and the
    /// integral is zero at the first knot. The matrix is `(dim + order) x dim`.
    pub fn integral(&self, order: usize) -> (Basis, Array2<f64>) {
        let mut basis = self.clone();
        let mut transform = Array2::<f64>::eye(self.dim());
        for _ in 0..order {
            let (next, step) = basis.integral_step();
            transform = step.dot(&transform);
            basis = next;
        }
        (basis, transform)
    }

    fn integral_step(&self) -> (Basis, Array2<f64>) {
        let out = self.order_increase(1);
        let t = self.knots();
        let o = self.order();
        let dim = self.dim();

        let mut step = Array2::zeros((dim + 1, dim));
        for c in 0..dim {
            let weight = (t[o + c] - t[c]) / o as f64;
            for r in (c + 1)..=dim {
                step[[r, c]] = weight;
            }
        }
        (out, step)
    }

    /// Applies the `order`-th integral directly to a coefficient matrix as a
    /// running sum seeded with zero.
    pub fn integral_coefficients(
        &self,
        coefficients: &Array2<f64>,
        order: usize,
    ) -> SplineResult<(Basis, Array2<f64>)> {
        self.check_rows(coefficients)?;
        let mut basis = self.clone();
        let mut values = coefficients.clone();

        for _ in 0..order {
            let out = basis.order_increase(1);
            let t = basis.knots();
            let o = basis.order();

            let mut next = Array2::zeros((values.nrows() + 1, values.ncols()));
            for r in 1..next.nrows() {
                let weight = (t[o + r - 1] - t[r - 1]) / o as f64;
                let sum = &next.row(r - 1) + &(&values.row(r - 1) * weight);
                next.row_mut(r).assign(&sum);
            }
            values = next;
            basis = out;
        }

        Ok((basis, values))
    }

    /// Basis of the sum of a function in this basis and one in `other`, with
    /// the transforms of both operands' coefficients into it.
    ///
    /// The output basis combines both at the larger order. Output coefficients
    /// are `left * c_self + right * c_other`. Each transform is obtained by
    /// fitting the operand's basis functions at the sample sites of the output
    /// basis.
    pub fn add(&self, other: &Basis) -> SplineResult<(Basis, Array2<f64>, Array2<f64>)> {
        let target = self.order().max(other.order());
        let out = self.combine(other, target, self.tolerances().knot)?;
        let sites = out.sample_sites();
        let design = out.evaluate(&sites);

        let left = least_squares(&design, &self.evaluate(&sites))?;
        let right = least_squares(&design, &other.evaluate(&sites))?;
        debug!("sum basis: order {}, {} functions", out.order(), out.dim());
        Ok((out, left, right))
    }

    /// Basis of the product of a function in this basis and one in `other`,
    /// with the transform of the row-major Kronecker product of both
    /// coefficient vectors into it.
    ///
    /// The output order is `order + other.order - 1`; the transform has
    /// `self.dim() * other.dim()` columns.
    pub fn prod(&self, other: &Basis) -> SplineResult<(Basis, Array2<f64>)> {
        let target = self.order() + other.order() - 1;
        let out = self.combine(other, target, self.tolerances().knot)?;
        let sites = out.sample_sites();
        let design = out.evaluate(&sites);

        let products = khatri_rao(&self.evaluate(&sites), &other.evaluate(&sites))?;
        let transform = least_squares(&design, &products)?;
        debug!("product basis: order {}, {} functions", out.order(), out.dim());
        Ok((out, transform))
    }

    pub(crate) fn check_rows(&self, coefficients: &Array2<f64>) -> SplineResult<()> {
        if coefficients.nrows() != self.dim() {
            return Err(SplineError::DimensionMismatch(format!(
                "{} coefficient rows for a basis of dimension {}",
                coefficients.nrows(),
                self.dim()
            )));
        }
        Ok(())
    }
}
