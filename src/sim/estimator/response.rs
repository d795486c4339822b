use crate::error::{Error, Result};
use crate::sim::particle::ParticleState;

/// Response function folded into every estimator contribution.
///
/// An estimator keeps an independent set of moments per assigned response.
pub trait ParticleResponse: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the response value for the particle state (>= 0).
    fn evaluate(&self, particle: &ParticleState) -> f64;
}

/// Unit response: contributions are scored unchanged.
pub struct UnitResponse;

impl ParticleResponse for UnitResponse {
    fn name(&self) -> &str {
        "default"
    }

    fn evaluate(&self, _particle: &ParticleState) -> f64 {
        1.
    }
}

/// Energy-dependent response tabulated on an increasing energy grid.
///
/// Values are interpolated linearly in energy. Outside the grid the
/// response is zero.
pub struct EnergyResponse {
    name: String,
    energies: Vec<f64>,
    values: Vec<f64>,
}

impl EnergyResponse {
    pub fn new(name: impl Into<String>, energies: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if energies.len() < 2 || energies.len() != values.len() {
            return Err(Error::InvalidParam(format!(
                "response '{name}': need at least two energies with one value each"
            )));
        }
        if energies.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::InvalidParam(format!(
                "response '{name}': energies must be strictly increasing"
            )));
        }
        if values.iter().any(|v| !v.is_finite() || *v < 0.) {
            return Err(Error::InvalidParam(format!(
                "response '{name}': values must be finite and non-negative"
            )));
        }
        Ok(Self {
            name,
            energies,
            values,
        })
    }

    pub fn value_at(&self, energy: f64) -> f64 {
        let last = self.energies.len() - 1;
        if !(energy >= self.energies[0] && energy <= self.energies[last]) {
            return 0.;
        }
        // energy >= energies[0], so upper >= 1
        let upper = self.energies.partition_point(|&e| e <= energy).min(last);
        let (e0, e1) = (self.energies[upper - 1], self.energies[upper]);
        let (v0, v1) = (self.values[upper - 1], self.values[upper]);
        v0 + (v1 - v0) * (energy - e0) / (e1 - e0)
    }
}

impl ParticleResponse for EnergyResponse {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, particle: &ParticleState) -> f64 {
        self.value_at(particle.energy())
    }
}
