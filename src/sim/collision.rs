//! Collision backend using energy-independent material cross sections.

use crate::error::{Error, Result};
use crate::sim::framework::{Collision, HistoryRng, sample_isotropic_direction};
use crate::sim::materials::{MaterialComponent, MaterialLibrary};
use crate::sim::particle::{Bank, EntityId, ParticleState, ReactionTag};
use rand::Rng;
use std::f64::consts::PI;

/// Default weight below which survival-biased particles play roulette.
pub const DEFAULT_WEIGHT_CUTOFF: f64 = 0.25;
/// Default weight given to roulette survivors.
pub const DEFAULT_SURVIVAL_WEIGHT: f64 = 0.5;

/// Collision physics from the cell materials of a [`MaterialLibrary`].
///
/// The nuclide is chosen in proportion to its macroscopic cross section.
/// It then absorbs, undergoes (n,2n) or scatters elastically (isotropic in
/// the centre-of-mass frame).
pub struct MaterialCollisionHandler {
    materials: MaterialLibrary,
    weight_cutoff: f64,
    survival_weight: f64,
}

impl MaterialCollisionHandler {
    pub fn new(materials: MaterialLibrary) -> Self {
        Self {
            materials,
            weight_cutoff: DEFAULT_WEIGHT_CUTOFF,
            survival_weight: DEFAULT_SURVIVAL_WEIGHT,
        }
    }

    /// Sets the Russian roulette parameters used with survival biasing.
    pub fn with_roulette(mut self, weight_cutoff: f64, survival_weight: f64) -> Result<Self> {
        if !(weight_cutoff > 0. && weight_cutoff < survival_weight && survival_weight.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "roulette requires 0 < cutoff < survival weight, got {weight_cutoff} and {survival_weight}"
            )));
        }
        self.weight_cutoff = weight_cutoff;
        self.survival_weight = survival_weight;
        Ok(self)
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    /// Elastic scatter off a nucleus at rest, isotropic in the CM frame.
    fn elastic_scatter(
        &self,
        particle: &mut ParticleState,
        nuclide: &MaterialComponent,
        rng: &mut HistoryRng,
    ) {
        let a = nuclide.atomic_weight_ratio;
        let mu_cm = 2. * rng.r#gen::<f64>() - 1.;
        let s = (a * a + 2. * a * mu_cm + 1.).max(0.);
        let energy = particle.energy() * s / ((a + 1.) * (a + 1.));
        let mu_lab = if s > 0. { (1. + a * mu_cm) / s.sqrt() } else { 0. };
        let phi = 2. * PI * rng.r#gen::<f64>();

        particle.set_energy(energy);
        particle.set_direction(
            particle
                .direction()
                .rotate_through_polar_and_azimuthal(mu_lab, phi),
        );
    }

    /// Survival biasing: removes the absorbed fraction of the weight and
    /// plays roulette on light particles. Returns false if the particle died.
    fn apply_implicit_capture(
        &self,
        particle: &mut ParticleState,
        absorption_fraction: f64,
        rng: &mut HistoryRng,
    ) -> bool {
        if absorption_fraction >= 1. {
            particle.set_as_gone();
            return false;
        }
        particle.multiply_weight(1. - absorption_fraction);
        if particle.weight() < self.weight_cutoff {
            if rng.r#gen::<f64>() < particle.weight() / self.survival_weight {
                particle.set_weight(self.survival_weight);
            } else {
                particle.set_as_gone();
                return false;
            }
        }
        true
    }
}

impl Collision for MaterialCollisionHandler {
    fn name(&self) -> &'static str {
        "material collision handler"
    }

    fn is_cell_void(&self, cell: EntityId) -> bool {
        self.materials.is_cell_void(cell)
    }

    fn macroscopic_total_cross_section(&self, particle: &ParticleState) -> f64 {
        self.materials
            .material_in_cell(particle.cell())
            .map(|m| m.macroscopic_total_cross_section())
            .unwrap_or(0.)
    }

    fn macroscopic_reaction_cross_section(
        &self,
        particle: &ParticleState,
        reaction: ReactionTag,
    ) -> f64 {
        let Some(material) = self.materials.material_in_cell(particle.cell()) else {
            return 0.;
        };
        match reaction {
            ReactionTag::CAPTURE => material.macroscopic_absorption_cross_section(),
            ReactionTag::N2N => material.macroscopic_n2n_cross_section(),
            ReactionTag::ELASTIC => {
                material.macroscopic_total_cross_section()
                    - material.macroscopic_absorption_cross_section()
                    - material.macroscopic_n2n_cross_section()
            }
            _ => 0.,
        }
    }

    fn collide_with_cell_material(
        &self,
        particle: &mut ParticleState,
        bank: &mut dyn Bank,
        analogue: bool,
        rng: &mut HistoryRng,
    ) {
        let Some(material) = self.materials.material_in_cell(particle.cell()) else {
            return;
        };
        let Some(nuclide) = material.sample_component(rng.r#gen()) else {
            return;
        };
        particle.increment_collision_number();

        if analogue {
            if rng.r#gen::<f64>() < nuclide.absorption_fraction {
                particle.set_as_gone();
                return;
            }
        } else if !self.apply_implicit_capture(particle, nuclide.absorption_fraction, rng) {
            return;
        }

        if nuclide.n2n_fraction > 0. && rng.r#gen::<f64>() < nuclide.n2n_fraction {
            // Both outgoing neutrons share the incident energy and leave isotropically
            particle.set_energy(0.5 * particle.energy());
            let mut secondary = particle.spawn_secondary(particle.particle_type(), true, true);
            secondary.set_direction(sample_isotropic_direction(rng));
            bank.push_from_reaction(secondary, ReactionTag::N2N);
            particle.set_direction(sample_isotropic_direction(rng));
            return;
        }

        self.elastic_scatter(particle, nuclide, rng);
    }
}
