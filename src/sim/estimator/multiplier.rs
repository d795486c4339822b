use crate::sim::particle::ParticleState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Factor applied to every raw contribution of an estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContributionMultiplier {
    /// Particle weight.
    #[default]
    Weight,
    /// Particle weight times its energy.
    WeightAndEnergy,
}

impl ContributionMultiplier {
    pub fn value(&self, particle: &ParticleState) -> f64 {
        match self {
            Self::Weight => particle.weight(),
            Self::WeightAndEnergy => particle.weight() * particle.energy(),
        }
    }
}

impl fmt::Display for ContributionMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weight => write!(f, "weight"),
            Self::WeightAndEnergy => write!(f, "weight x energy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::particle::ParticleType;

    #[test]
    fn test_multiplier_values() {
        let mut p = ParticleState::new(0, ParticleType::Photon);
        p.set_weight(2.);
        p.set_energy(3.);
        assert!((ContributionMultiplier::Weight.value(&p) - 2.).abs() < 1e-15);
        assert!((ContributionMultiplier::WeightAndEnergy.value(&p) - 6.).abs() < 1e-15);
        assert_eq!(ContributionMultiplier::default(), ContributionMultiplier::Weight);
    }
}
