use crate::Vector;
use crate::geom::EPS;
use std::fmt;
use std::ops::Add;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns true if both points are very close to each other.
    pub fn is_close(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EPS
            && (self.y - other.y).abs() < EPS
            && (self.z - other.z).abs() < EPS
    }

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(6);
        write!(
            f,
            "Point({:.prec$}, {:.prec$}, {:.prec$})",
            self.x,
            self.y,
            self.z,
            prec = prec
        )
    }
}

// Implement +
// (Sub is NOT implemented)
impl Add<Vector> for Point {
    type Output = Point;
    fn add(self, other: Vector) -> Self {
        Self {
            x: self.x + other.dx,
            y: self.y + other.dy,
            z: self.z + other.dz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_close() {
        let pa = Point::new(5., 5., 5.);
        let pb = Point::new(5.00000000000001, 5., 5.);
        let pc = Point::new(5.0001, 5., 5.);
        assert!(pa.is_close(&pb));
        assert!(!pa.is_close(&pc));
    }

    #[test]
    fn test_add_vector() {
        let p = Point::new(1., 2., 3.) + Vector::new(0.5, -2., 1.);
        assert!(p.is_close(&Point::new(1.5, 0., 4.)));
    }

    #[test]
    fn test_is_finite() {
        assert!(Point::new(0., 1., 2.).is_finite());
        assert!(!Point::new(f64::NAN, 1., 2.).is_finite());
        assert!(!Point::new(0., f64::INFINITY, 2.).is_finite());
    }

    #[test]
    fn test_display_precision() {
        let p = Point::new(1., 2.5, -3.);
        assert_eq!(format!("{:.1}", p), "Point(1.0, 2.5, -3.0)");
    }
}
