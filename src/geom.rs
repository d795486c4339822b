pub mod point;
pub mod ray;
pub mod slab;
pub mod vector;

/// Geometric precision
const EPS: f64 = 1e-13;

/// Tolerance used when checking that a direction is a unit vector.
pub const UNIT_TOL: f64 = 1e-9;
