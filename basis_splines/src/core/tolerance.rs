/// Default band below which a recurrence denominator counts as zero.
pub const DEFAULT_DENOMINATOR_TOLERANCE: f64 = 1e-6;

/// Default slack applied at the two global boundary knots during evaluation.
pub const DEFAULT_DOMAIN_TOLERANCE: f64 = 1e-6;

/// Default band within which two knots or breakpoints are considered equal.
pub const DEFAULT_KNOT_TOLERANCE: f64 = 1e-6;

/// Comparison bands used by a [`Basis`](crate::core::basis::Basis).
///
/// Every basis derived from another one (derivative, integral, combination,
/// segment, ...) inherits the tolerances of its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Denominators of the evaluation recurrence and the derivative transform
    /// with an absolute value below this band are treated as zero.
    pub denominator: f64,
    /// Points this far outside the first or last knot still evaluate as inside.
    pub domain: f64,
    /// Knots closer than this band collapse into one breakpoint.
    pub knot: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            denominator: DEFAULT_DENOMINATOR_TOLERANCE,
            domain: DEFAULT_DOMAIN_TOLERANCE,
            knot: DEFAULT_KNOT_TOLERANCE,
        }
    }
}

impl Tolerances {
    /// Uses the same band for every comparison.
    pub fn uniform(tolerance: f64) -> Self {
        Self {
            denominator: tolerance,
            domain: tolerance,
            knot: tolerance,
        }
    }
}
