//! Error type shared by every basis, interpolation and spline operation.

use thiserror::Error;

/// Result type for basis and spline operations.
pub type SplineResult<T> = Result<T, SplineError>;

/// Errors raised while building or transforming bases and splines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    /// A caller supplied argument was rejected. State is left unchanged.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Basis order must be at least 1, but was {0}.")]
    InvalidOrder(usize),

    #[error(
        "Insufficient knots for order {order}: need at least {required} knots but only {provided} were provided."
    )]
    InsufficientKnots {
        order: usize,
        required: usize,
        provided: usize,
    },

    #[error("The provided knot vector is invalid: {0}")]
    InvalidKnotVector(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Reducing the order by `requested` would leave no usable basis.
    #[error("Cannot reduce a basis of order {order} by {requested}.")]
    OrderReduction { order: usize, requested: usize },

    #[error("Least-squares solve failed: {0}")]
    Solve(String),
}
