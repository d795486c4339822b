use crate::error::LostParticle;
use crate::geom::ray::Ray;
use crate::sim::particle::{Bank, EntityId, HistoryNumber, ParticleState, ReactionTag};
use crate::{Point, Vector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use std::io::{self, Write};

/// Random number stream of one history.
pub type HistoryRng = ChaCha8Rng;

/// Stream for `history`, independent of the worker that runs it.
pub fn history_rng(seed: u64, history: HistoryNumber) -> HistoryRng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(history);
    rng
}

/// Direction uniformly distributed over the unit sphere.
pub fn sample_isotropic_direction(rng: &mut HistoryRng) -> Vector {
    let mu = 2. * rng.r#gen::<f64>() - 1.;
    let phi = 2. * PI * rng.r#gen::<f64>();
    let sin_theta = (1. - mu * mu).max(0.).sqrt();
    Vector::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Nearest bounding surface along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub surface: EntityId,
    pub distance: f64,
}

/// Geometry backend: cell containment and ray tracing.
///
/// Every query may fail with [`LostParticle`]; the transport loop then
/// terminates only the affected particle.
pub trait Geometry: Send + Sync {
    /// Human-readable identifier for logging.
    fn name(&self) -> &'static str;

    /// Cell containing the ray origin. Points on a surface are resolved
    /// using the ray direction.
    fn find_cell_containing_point(&self, ray: &Ray) -> Result<EntityId, LostParticle>;

    /// Nearest surface bounding `current_cell` along the ray.
    fn fire_ray(&self, ray: &Ray, current_cell: EntityId) -> Result<SurfaceHit, LostParticle>;

    /// Outward unit normal of `surface` at `point`.
    fn surface_normal(&self, surface: EntityId, point: Point) -> Result<Vector, LostParticle>;

    /// Entering a termination cell ends the particle.
    fn is_termination_cell(&self, cell: EntityId) -> bool;

    /// Called after each collision; backends caching ray state reset it here.
    fn new_ray(&self) {}
}

/// Collision backend: cross sections and collision physics.
pub trait Collision: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_cell_void(&self, cell: EntityId) -> bool;

    /// Macroscopic total cross section (1/cm) in the particle's cell.
    fn macroscopic_total_cross_section(&self, particle: &ParticleState) -> f64;

    fn macroscopic_reaction_cross_section(
        &self,
        particle: &ParticleState,
        reaction: ReactionTag,
    ) -> f64;

    /// Number of mean free paths to the next collision.
    fn sample_optical_path_length(&self, rng: &mut HistoryRng) -> f64 {
        // 1 - u lies in (0, 1], so the path is always finite
        -(1. - rng.r#gen::<f64>()).ln()
    }

    /// Samples a collision at the particle's position.
    ///
    /// May change energy, direction and weight, terminate the particle and
    /// push secondaries. With `analogue == false` absorption is replaced by
    /// a weight reduction (survival biasing).
    fn collide_with_cell_material(
        &self,
        particle: &mut ParticleState,
        bank: &mut dyn Bank,
        analogue: bool,
        rng: &mut HistoryRng,
    );
}

/// Source backend.
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pushes the particle(s) starting `history` into `bank`.
    fn sample_particle_state(
        &self,
        bank: &mut dyn Bank,
        history: HistoryNumber,
        rng: &mut HistoryRng,
    );

    /// Fraction of sampling trials that produced a particle.
    fn sampling_efficiency(&self) -> f64;

    fn print_summary(&self, os: &mut dyn Write) -> io::Result<()> {
        writeln!(os, "Source: {}", self.name())?;
        writeln!(os, "  Sampling Efficiency: {}", self.sampling_efficiency())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Void;

    impl Collision for Void {
        fn name(&self) -> &'static str {
            "void"
        }

        fn is_cell_void(&self, _cell: EntityId) -> bool {
            true
        }

        fn macroscopic_total_cross_section(&self, _particle: &ParticleState) -> f64 {
            0.
        }

        fn macroscopic_reaction_cross_section(
            &self,
            _particle: &ParticleState,
            _reaction: ReactionTag,
        ) -> f64 {
            0.
        }

        fn collide_with_cell_material(
            &self,
            _particle: &mut ParticleState,
            _bank: &mut dyn Bank,
            _analogue: bool,
            _rng: &mut HistoryRng,
        ) {
        }
    }

    #[test]
    fn test_history_rng_is_reproducible() {
        let mut r1 = history_rng(7, 12);
        let mut r2 = history_rng(7, 12);
        let a: Vec<u64> = (0..4).map(|_| r1.r#gen()).collect();
        let b: Vec<u64> = (0..4).map(|_| r2.r#gen()).collect();
        assert_eq!(a, b);

        let mut other = history_rng(7, 13);
        let c: u64 = other.r#gen();
        assert_ne!(a[0], c);
    }

    #[test]
    fn test_isotropic_direction() {
        let mut rng = history_rng(3, 5);
        let n = 20_000;
        let mut mean_mu = 0.;
        for _ in 0..n {
            let d = sample_isotropic_direction(&mut rng);
            assert!(d.is_unit());
            mean_mu += d.dz;
        }
        assert!((mean_mu / n as f64).abs() < 0.03);
    }

    #[test]
    fn test_optical_path_is_exponential() {
        let mut rng = history_rng(1, 0);
        let n = 20_000;
        let mut sum = 0.;
        for _ in 0..n {
            let op = Void.sample_optical_path_length(&mut rng);
            assert!(op.is_finite() && op >= 0.);
            sum += op;
        }
        // Mean of Exp(1)
        assert!((sum / n as f64 - 1.).abs() < 0.05);
    }
}
