pub mod basis;
pub mod error;
pub mod interpolate;
pub mod knots;
pub mod math;
pub mod solver_interface;
pub mod splines;
pub mod tolerance;
pub mod transform;
