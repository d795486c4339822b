//! Rays used for particle tracking.
//!
//! A ray is the particle's current position and direction of flight.
//! Geometry backends consume rays to locate cells and find the distance
//! to the next bounding surface.

use crate::{Point, Vector};

/// Smallest accepted distance to a plane in front of the ray origin.
pub const MIN_HIT_DISTANCE: f64 = 1e-10;

/// A ray defined by an origin point and a unit direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Unit direction vector
    pub direction: Vector,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let normalized = direction.normalize()?;
        Some(Self {
            origin,
            direction: normalized,
        })
    }

    /// Creates a ray from a direction that is already a unit vector.
    pub fn from_unit(origin: Point, direction: Vector) -> Self {
        debug_assert!(direction.is_unit());
        Self { origin, direction }
    }

    /// Returns the point along the ray at parameter t.
    ///
    /// point = origin + t * direction
    pub fn point_at(&self, t: f64) -> Point {
        self.origin + self.direction * t
    }

    /// Distance to the plane `a*x + b*y + c*z + d = 0` along the ray.
    ///
    /// Returns `None` if the ray is parallel to the plane or the plane lies
    /// behind the origin (or closer than `MIN_HIT_DISTANCE`).
    pub fn intersect_plane(&self, normal: Vector, d: f64) -> Option<f64> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-12 {
            return None;
        }

        // Substitute origin + t * direction into the plane equation and solve for t
        let origin_dot =
            normal.dx * self.origin.x + normal.dy * self.origin.y + normal.dz * self.origin.z + d;
        let t = -origin_dot / denom;

        if t < MIN_HIT_DISTANCE { None } else { Some(t) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes() {
        let ray = Ray::new(Point::new(0., 0., 0.), Vector::new(0., 3., 0.)).unwrap();
        assert!(ray.direction.is_close(&Vector::new(0., 1., 0.)));
        assert!(Ray::new(Point::new(0., 0., 0.), Vector::new(0., 0., 0.)).is_none());
    }

    #[test]
    fn test_point_at() {
        let ray = Ray::from_unit(Point::new(1., 0., 0.), Vector::new(0., 0., 1.));
        assert!(ray.point_at(2.5).is_close(&Point::new(1., 0., 2.5)));
    }

    #[test]
    fn test_intersect_plane() {
        // Plane x = 3
        let ray = Ray::from_unit(Point::new(1., 0., 0.), Vector::new(1., 0., 0.));
        let t = ray.intersect_plane(Vector::new(1., 0., 0.), -3.).unwrap();
        assert!((t - 2.).abs() < 1e-12);

        // Oblique incidence doubles the distance at 60 degrees
        let dir = Vector::new(0.5, (0.75f64).sqrt(), 0.);
        let ray = Ray::from_unit(Point::new(1., 0., 0.), dir);
        let t = ray.intersect_plane(Vector::new(1., 0., 0.), -3.).unwrap();
        assert!((t - 4.).abs() < 1e-12);
    }

    #[test]
    fn test_intersect_plane_misses() {
        // Parallel
        let ray = Ray::from_unit(Point::new(1., 0., 0.), Vector::new(0., 1., 0.));
        assert!(ray.intersect_plane(Vector::new(1., 0., 0.), -3.).is_none());
        // Behind
        let ray = Ray::from_unit(Point::new(1., 0., 0.), Vector::new(-1., 0., 0.));
        assert!(ray.intersect_plane(Vector::new(1., 0., 0.), -3.).is_none());
        // On the plane
        let ray = Ray::from_unit(Point::new(3., 0., 0.), Vector::new(1., 0., 0.));
        assert!(ray.intersect_plane(Vector::new(1., 0., 0.), -3.).is_none());
    }
}
