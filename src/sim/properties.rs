use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::sim::particle::ParticleType;

/// Run-time settings of a transport simulation.
///
/// Every field has a default, so a TOML file only needs the values it changes:
///
/// ```toml
/// number_of_histories = 100000
/// number_of_threads = 8
/// analogue_collisions = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationProperties {
    // Run
    pub number_of_histories: u64,
    pub number_of_threads: usize,
    pub seed: u64,
    /// Number of the first history (histories are numbered consecutively).
    pub start_history: u64,
    /// Log progress every N histories (0 disables it).
    pub progress_interval: u64,

    // Collisions
    /// If `false`, absorption is replaced by survival biasing.
    pub analogue_collisions: bool,

    // Energy cutoffs (MeV), shared by forward and adjoint particles
    pub min_neutron_energy: f64,
    pub min_photon_energy: f64,
    pub min_electron_energy: f64,

    // Estimators
    pub surface_flux_angle_cosine_cutoff: f64,
}

impl SimulationProperties {
    pub fn new() -> Self {
        Self {
            number_of_histories: 1000,
            number_of_threads: 1,
            seed: 1,
            start_history: 0,
            progress_interval: 0,
            analogue_collisions: true,
            min_neutron_energy: 1e-11,
            min_photon_energy: 1e-3,
            min_electron_energy: 1e-4,
            surface_flux_angle_cosine_cutoff: 0.001,
        }
    }

    /// Energy below which particles of `particle_type` are killed.
    pub fn min_energy(&self, particle_type: ParticleType) -> f64 {
        match particle_type.forward() {
            ParticleType::Neutron => self.min_neutron_energy,
            ParticleType::Electron => self.min_electron_energy,
            _ => self.min_photon_energy,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let properties: Self = toml::from_str(text).context("invalid simulation properties")?;
        properties.validate()?;
        Ok(properties)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read properties file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.number_of_threads > 0, "number_of_threads must be at least 1");
        for (name, value) in [
            ("min_neutron_energy", self.min_neutron_energy),
            ("min_photon_energy", self.min_photon_energy),
            ("min_electron_energy", self.min_electron_energy),
        ] {
            anyhow::ensure!(
                value.is_finite() && value > 0.,
                "{name} must be positive, got {value}"
            );
        }
        anyhow::ensure!(
            self.surface_flux_angle_cosine_cutoff > 0. && self.surface_flux_angle_cosine_cutoff <= 1.,
            "surface_flux_angle_cosine_cutoff must be in (0, 1]"
        );
        Ok(())
    }
}

impl Default for SimulationProperties {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_defaults() {
        let p = SimulationProperties::default();
        assert_eq!(p.number_of_histories, 1000);
        assert_eq!(p.number_of_threads, 1);
        assert!(p.analogue_collisions);
        assert!((p.min_photon_energy - 1e-3).abs() < 1e-15);
        assert!((p.surface_flux_angle_cosine_cutoff - 0.001).abs() < 1e-15);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_min_energy_per_type() {
        let p = SimulationProperties::new();
        assert!((p.min_energy(ParticleType::Neutron) - 1e-11).abs() < 1e-20);
        assert!((p.min_energy(ParticleType::AdjointNeutron) - 1e-11).abs() < 1e-20);
        assert!((p.min_energy(ParticleType::AdjointPhoton) - 1e-3).abs() < 1e-15);
        assert!((p.min_energy(ParticleType::Electron) - 1e-4).abs() < 1e-15);
    }

    #[test]
    fn test_partial_toml() {
        let p = SimulationProperties::from_toml_str(
            "number_of_histories = 50\nnumber_of_threads = 4\nanalogue_collisions = false\n",
        )
        .unwrap();
        assert_eq!(p.number_of_histories, 50);
        assert_eq!(p.number_of_threads, 4);
        assert!(!p.analogue_collisions);
        assert_eq!(p.seed, 1);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(SimulationProperties::from_toml_str("number_of_threads = 0").is_err());
        assert!(SimulationProperties::from_toml_str("number_of_threads = \"four\"").is_err());
        assert!(SimulationProperties::from_toml_str("min_photon_energy = -1.0").is_err());
    }

    #[test]
    fn test_zero_energy_cutoff_is_rejected() {
        let err = SimulationProperties::from_toml_str("min_neutron_energy = 0.0").unwrap_err();
        assert!(format!("{err:#}").contains("min_neutron_energy must be positive"));
        assert!(SimulationProperties::from_toml_str("min_electron_energy = 1e-9").is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut p = SimulationProperties::new();
        p.seed = 77;
        let text = toml::to_string(&p).unwrap();
        assert_eq!(SimulationProperties::from_toml_str(&text).unwrap(), p);
    }

    #[test]
    fn test_missing_file() {
        let err = SimulationProperties::from_toml_file(Path::new("/nonexistent/props.toml"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("cannot read properties file"));
    }
}
