//! Point source backend.

use crate::error::{Error, Result};
use crate::sim::framework::{HistoryRng, Source, sample_isotropic_direction};
use crate::sim::particle::{Bank, HistoryNumber, ParticleState, ParticleType};
use crate::{Point, Vector};
use std::sync::atomic::{AtomicU64, Ordering};

/// Angular distribution of emitted particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmissionDirection {
    /// Uniform over the unit sphere.
    Isotropic,
    /// Always along one unit vector.
    Fixed(Vector),
    /// Uniform inside a cone around `axis` (`cos(angle) >= min_cosine`).
    /// Sampled by rejection from the isotropic distribution.
    Cone { axis: Vector, min_cosine: f64 },
}

/// Monoenergetic point source.
pub struct PointSource {
    position: Point,
    particle_type: ParticleType,
    energy: f64,
    direction: EmissionDirection,
    trials: AtomicU64,
    samples: AtomicU64,
}

impl PointSource {
    pub fn new(position: Point, particle_type: ParticleType, energy: f64) -> Result<Self> {
        if !(energy.is_finite() && energy > 0.) {
            return Err(Error::InvalidParam(format!(
                "source energy must be positive, got {energy}"
            )));
        }
        Ok(Self {
            position,
            particle_type,
            energy,
            direction: EmissionDirection::Isotropic,
            trials: AtomicU64::new(0),
            samples: AtomicU64::new(0),
        })
    }

    pub fn with_direction(mut self, direction: EmissionDirection) -> Result<Self> {
        self.direction = match direction {
            EmissionDirection::Isotropic => direction,
            EmissionDirection::Fixed(v) => EmissionDirection::Fixed(Self::unit(v)?),
            EmissionDirection::Cone { axis, min_cosine } => {
                if !(min_cosine >= -1. && min_cosine < 1.) {
                    return Err(Error::InvalidParam(format!(
                        "cone cosine must be in [-1, 1), got {min_cosine}"
                    )));
                }
                EmissionDirection::Cone {
                    axis: Self::unit(axis)?,
                    min_cosine,
                }
            }
        };
        Ok(self)
    }

    fn unit(v: Vector) -> Result<Vector> {
        v.normalize()
            .ok_or_else(|| Error::InvalidParam("source direction has zero length".to_string()))
    }

    fn sample_direction(&self, rng: &mut HistoryRng) -> Vector {
        match self.direction {
            EmissionDirection::Isotropic => {
                self.trials.fetch_add(1, Ordering::Relaxed);
                sample_isotropic_direction(rng)
            }
            EmissionDirection::Fixed(v) => {
                self.trials.fetch_add(1, Ordering::Relaxed);
                v
            }
            EmissionDirection::Cone { axis, min_cosine } => loop {
                self.trials.fetch_add(1, Ordering::Relaxed);
                let d = sample_isotropic_direction(rng);
                if d.dot(axis) >= min_cosine {
                    break d;
                }
            },
        }
    }
}

impl Source for PointSource {
    fn name(&self) -> &'static str {
        "point source"
    }

    fn sample_particle_state(
        &self,
        bank: &mut dyn Bank,
        history: HistoryNumber,
        rng: &mut HistoryRng,
    ) {
        let mut particle = ParticleState::new(history, self.particle_type);
        particle.set_position(self.position);
        particle.set_direction(self.sample_direction(rng));
        particle.set_energy(self.energy);
        self.samples.fetch_add(1, Ordering::Relaxed);
        bank.push(particle);
    }

    fn sampling_efficiency(&self) -> f64 {
        let trials = self.trials.load(Ordering::Relaxed);
        if trials == 0 {
            return 1.;
        }
        self.samples.load(Ordering::Relaxed) as f64 / trials as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::framework::history_rng;
    use crate::sim::particle::ParticleBank;

    #[test]
    fn test_fixed_direction() {
        let source = PointSource::new(Point::new(1., 2., 3.), ParticleType::Photon, 0.662)
            .unwrap()
            .with_direction(EmissionDirection::Fixed(Vector::new(0., 0., -2.)))
            .unwrap();
        let mut bank = ParticleBank::new();
        source.sample_particle_state(&mut bank, 9, &mut history_rng(1, 9));
        let p = bank.pop().unwrap();
        assert_eq!(p.history_number(), 9);
        assert_eq!(p.particle_type(), ParticleType::Photon);
        assert!(p.position().is_close(&Point::new(1., 2., 3.)));
        assert!(p.direction().is_close(&Vector::new(0., 0., -1.)));
        assert!((p.energy() - 0.662).abs() < 1e-15);
        assert!((source.sampling_efficiency() - 1.).abs() < 1e-15);
    }

    #[test]
    fn test_cone_efficiency() {
        // Cone with half-solid-angle fraction (1 - 0) / 2 = 0.5
        let source = PointSource::new(Point::new(0., 0., 0.), ParticleType::Neutron, 14.1)
            .unwrap()
            .with_direction(EmissionDirection::Cone {
                axis: Vector::new(1., 0., 0.),
                min_cosine: 0.,
            })
            .unwrap();
        let mut bank = ParticleBank::new();
        for history in 0..4000 {
            source.sample_particle_state(&mut bank, history, &mut history_rng(5, history));
            let p = bank.pop().unwrap();
            assert!(p.direction().dx >= 0.);
        }
        assert!((source.sampling_efficiency() - 0.5).abs() < 0.03);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(PointSource::new(Point::new(0., 0., 0.), ParticleType::Neutron, 0.).is_err());
        let source = PointSource::new(Point::new(0., 0., 0.), ParticleType::Neutron, 1.).unwrap();
        assert!(source
            .with_direction(EmissionDirection::Fixed(Vector::new(0., 0., 0.)))
            .is_err());
        let source = PointSource::new(Point::new(0., 0., 0.), ParticleType::Neutron, 1.).unwrap();
        assert!(source
            .with_direction(EmissionDirection::Cone {
                axis: Vector::new(0., 0., 1.),
                min_cosine: 1.,
            })
            .is_err());
    }
}
