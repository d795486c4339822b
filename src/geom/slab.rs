//! One-dimensional slab geometry.
//!
//! Cells are bounded by planes `x = const` and extend infinitely in y and z.
//! Everything left of the first plane or right of the last one belongs to a
//! single termination cell.

use crate::error::{Error, LostParticle, Result};
use crate::geom::ray::Ray;
use crate::sim::framework::{Geometry, SurfaceHit};
use crate::sim::particle::EntityId;
use crate::{Point, Vector};

/// Distance used to decide on which side of a plane a point lies.
const PLANE_TOL: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SlabModel {
    planes: Vec<f64>,
    surface_ids: Vec<EntityId>,
    cell_ids: Vec<EntityId>,
    termination_cell: EntityId,
}

impl SlabModel {
    /// Creates a slab model with explicit ids.
    ///
    /// `planes` must be strictly increasing, with one surface id per plane and
    /// one cell id per gap between consecutive planes.
    pub fn new(
        planes: Vec<f64>,
        surface_ids: Vec<EntityId>,
        cell_ids: Vec<EntityId>,
        termination_cell: EntityId,
    ) -> Result<Self> {
        if planes.len() < 2 {
            return Err(Error::Config("a slab model needs at least two planes".to_string()));
        }
        if planes.iter().any(|p| !p.is_finite()) || planes.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Config(
                "slab planes must be finite and strictly increasing".to_string(),
            ));
        }
        if surface_ids.len() != planes.len() || cell_ids.len() + 1 != planes.len() {
            return Err(Error::Config(format!(
                "{} planes need {} surface ids and {} cell ids",
                planes.len(),
                planes.len(),
                planes.len() - 1
            )));
        }
        if cell_ids.contains(&termination_cell) {
            return Err(Error::Config(format!(
                "termination cell {termination_cell} is also a slab cell"
            )));
        }
        Ok(Self {
            planes,
            surface_ids,
            cell_ids,
            termination_cell,
        })
    }

    /// Numbers cells `1..=n` and surfaces `1..=n+1` from left to right.
    /// The termination cell is 0.
    pub fn from_planes(planes: Vec<f64>) -> Result<Self> {
        let n = planes.len() as EntityId;
        let surface_ids = (1..=n).collect();
        let cell_ids = (1..n).collect();
        Self::new(planes, surface_ids, cell_ids, 0)
    }

    pub fn cell_ids(&self) -> &[EntityId] {
        &self.cell_ids
    }

    pub fn surface_ids(&self) -> &[EntityId] {
        &self.surface_ids
    }

    pub fn termination_cell(&self) -> EntityId {
        self.termination_cell
    }

    /// Thickness of a cell, i.e. its volume per unit transverse area.
    pub fn cell_thickness(&self, cell: EntityId) -> Option<f64> {
        let i = self.cell_index(cell)?;
        Some(self.planes[i + 1] - self.planes[i])
    }

    /// Cells paired with their volume per unit area.
    pub fn cell_volumes(&self) -> Vec<(EntityId, f64)> {
        self.cell_ids
            .iter()
            .zip(self.planes.windows(2))
            .map(|(&cell, w)| (cell, w[1] - w[0]))
            .collect()
    }

    pub fn plane_position(&self, surface: EntityId) -> Option<f64> {
        let i = self.surface_ids.iter().position(|&s| s == surface)?;
        Some(self.planes[i])
    }

    fn cell_index(&self, cell: EntityId) -> Option<usize> {
        self.cell_ids.iter().position(|&c| c == cell)
    }
}

impl Geometry for SlabModel {
    fn name(&self) -> &'static str {
        "slab model"
    }

    fn find_cell_containing_point(&self, ray: &Ray) -> std::result::Result<EntityId, LostParticle> {
        let x = ray.origin.x;
        let dx = ray.direction.dx;
        if !x.is_finite() {
            return Err(LostParticle::new(format!("point {} is not finite", ray.origin)));
        }

        let on_plane = self.planes.iter().any(|p| (x - p).abs() < PLANE_TOL);
        let lookup_x = if !on_plane {
            x
        } else if dx > 0. {
            x + PLANE_TOL
        } else if dx < 0. {
            x - PLANE_TOL
        } else {
            return Err(LostParticle::new(format!(
                "point {} lies on a slab plane and the direction is parallel to it",
                ray.origin
            )));
        };

        let index = self.planes.partition_point(|&p| p <= lookup_x);
        if index == 0 || index == self.planes.len() {
            Ok(self.termination_cell)
        } else {
            Ok(self.cell_ids[index - 1])
        }
    }

    fn fire_ray(
        &self,
        ray: &Ray,
        current_cell: EntityId,
    ) -> std::result::Result<SurfaceHit, LostParticle> {
        let i = self.cell_index(current_cell).ok_or_else(|| {
            LostParticle::new(format!("cell {current_cell} is not a slab cell"))
        })?;
        let dx = ray.direction.dx;
        let normal = Vector::new(1., 0., 0.);

        // A ray parallel to the planes never leaves the cell
        let (plane, surface) = if dx > 0. {
            (self.planes[i + 1], self.surface_ids[i + 1])
        } else if dx < 0. {
            (self.planes[i], self.surface_ids[i])
        } else {
            return Ok(SurfaceHit {
                surface: self.surface_ids[i + 1],
                distance: f64::INFINITY,
            });
        };

        // Grazing rays fall back to the direct formula; a point already on
        // (or just past) the exit plane is at distance zero
        let distance = ray
            .intersect_plane(normal, -plane)
            .unwrap_or_else(|| ((plane - ray.origin.x) / dx).max(0.));
        Ok(SurfaceHit { surface, distance })
    }

    fn surface_normal(
        &self,
        surface: EntityId,
        point: Point,
    ) -> std::result::Result<Vector, LostParticle> {
        if self.plane_position(surface).is_none() {
            return Err(LostParticle::new(format!(
                "surface {surface} at {point} is not a slab plane"
            )));
        }
        Ok(Vector::new(1., 0., 0.))
    }

    fn is_termination_cell(&self, cell: EntityId) -> bool {
        cell == self.termination_cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SlabModel {
        SlabModel::from_planes(vec![0., 1., 3.]).unwrap()
    }

    fn ray(x: f64, dx: f64) -> Ray {
        Ray::new(Point::new(x, 0.5, -2.), Vector::new(dx, 0.3, 0.)).unwrap()
    }

    #[test]
    fn test_from_planes_ids() {
        let m = model();
        assert_eq!(m.cell_ids(), &[1, 2]);
        assert_eq!(m.surface_ids(), &[1, 2, 3]);
        assert_eq!(m.termination_cell(), 0);
        assert_eq!(m.cell_thickness(2), Some(2.));
        assert_eq!(m.cell_volumes(), vec![(1, 1.), (2, 2.)]);
        assert_eq!(m.plane_position(3), Some(3.));
    }

    #[test]
    fn test_invalid_models() {
        assert!(SlabModel::from_planes(vec![0.]).is_err());
        assert!(SlabModel::from_planes(vec![0., 0.]).is_err());
        assert!(SlabModel::new(vec![0., 1.], vec![1], vec![1], 0).is_err());
        assert!(SlabModel::new(vec![0., 1.], vec![1, 2], vec![5], 5).is_err());
    }

    #[test]
    fn test_find_cell() {
        let m = model();
        assert_eq!(m.find_cell_containing_point(&ray(0.5, 1.)), Ok(1));
        assert_eq!(m.find_cell_containing_point(&ray(2., -1.)), Ok(2));
        assert_eq!(m.find_cell_containing_point(&ray(-1., 1.)), Ok(0));
        assert_eq!(m.find_cell_containing_point(&ray(4., 1.)), Ok(0));
    }

    #[test]
    fn test_find_cell_on_plane_uses_direction() {
        let m = model();
        assert_eq!(m.find_cell_containing_point(&ray(1., 1.)), Ok(2));
        assert_eq!(m.find_cell_containing_point(&ray(1., -1.)), Ok(1));
        assert_eq!(m.find_cell_containing_point(&ray(3., 1.)), Ok(0));
        assert_eq!(m.find_cell_containing_point(&ray(0., 1.)), Ok(1));

        let parallel = Ray::new(Point::new(1., 0., 0.), Vector::new(0., 1., 0.)).unwrap();
        assert!(m.find_cell_containing_point(&parallel).is_err());
        let nan = Ray::from_unit(Point::new(f64::NAN, 0., 0.), Vector::new(1., 0., 0.));
        assert!(m.find_cell_containing_point(&nan).is_err());
    }

    #[test]
    fn test_fire_ray() {
        let m = model();
        let r = Ray::from_unit(Point::new(0.5, 0., 0.), Vector::new(1., 0., 0.));
        let hit = m.fire_ray(&r, 1).unwrap();
        assert_eq!(hit.surface, 2);
        assert!((hit.distance - 0.5).abs() < 1e-12);

        let r = Ray::from_unit(Point::new(2., 0., 0.), Vector::new(-0.5, (0.75f64).sqrt(), 0.));
        let hit = m.fire_ray(&r, 2).unwrap();
        assert_eq!(hit.surface, 2);
        assert!((hit.distance - 2.).abs() < 1e-12);

        // Starting on the entry plane
        let r = Ray::from_unit(Point::new(1., 0., 0.), Vector::new(1., 0., 0.));
        let hit = m.fire_ray(&r, 2).unwrap();
        assert_eq!(hit.surface, 3);
        assert!((hit.distance - 2.).abs() < 1e-12);
    }

    #[test]
    fn test_fire_ray_grazing() {
        let m = model();
        let dx = 1e-13;
        let dir = Vector::new(dx, (1. - dx * dx).sqrt(), 0.);
        let r = Ray::from_unit(Point::new(0.5, 0., 0.), dir);
        let hit = m.fire_ray(&r, 1).unwrap();
        assert_eq!(hit.surface, 2);
        assert!((hit.distance - 0.5 / dx).abs() / hit.distance < 1e-9);
    }

    #[test]
    fn test_fire_ray_parallel_and_unknown_cell() {
        let m = model();
        let r = Ray::from_unit(Point::new(0.5, 0., 0.), Vector::new(0., 0., 1.));
        assert!(m.fire_ray(&r, 1).unwrap().distance.is_infinite());
        assert!(m.fire_ray(&r, 0).is_err());
        assert!(m.fire_ray(&r, 9).is_err());
    }

    #[test]
    fn test_surface_normal_and_termination() {
        let m = model();
        let n = m.surface_normal(2, Point::new(1., 0., 0.)).unwrap();
        assert!(n.is_close(&Vector::new(1., 0., 0.)));
        assert!(m.surface_normal(7, Point::new(1., 0., 0.)).is_err());
        assert!(m.is_termination_cell(0));
        assert!(!m.is_termination_cell(1));
    }
}
