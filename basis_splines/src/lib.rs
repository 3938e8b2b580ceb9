//! B-spline bases and splines in the truncated-power representation.
//!
//! A [`Basis`] is a knot vector with an order. It evaluates its basis
//! functions, converts between knots and breakpoints, and builds the bases and
//! coefficient transforms of derivatives, integrals, sums and products. An
//! [`Interpolate`] fits coefficients to data and a [`Spline`] pairs a shared
//! basis with a coefficient matrix.

pub mod core;

pub use crate::core::basis::Basis;
pub use crate::core::error::{SplineError, SplineResult};
pub use crate::core::interpolate::Interpolate;
pub use crate::core::math::{khatri_rao, kron};
pub use crate::core::solver_interface::least_squares;
pub use crate::core::splines::Spline;
pub use crate::core::tolerance::Tolerances;
