//! Estimators scored on surface crossings.

use crate::error::{Error, Result};
use crate::sim::estimator::cell::impl_entity_estimator;
use crate::sim::estimator::discretization::{DimensionValues, PhaseSpaceDimension};
use crate::sim::estimator::entity::EntityEstimator;
use crate::sim::estimator::multiplier::ContributionMultiplier;
use crate::sim::estimator::response::ParticleResponse;
use crate::sim::estimator::{EstimatorId, EventSubscriber};
use crate::sim::event::{DispatchRegistry, ParticleCrossingSurfaceObserver};
use crate::sim::particle::{EntityId, ParticleState, ParticleType};
use std::sync::Arc;

/// Default grazing-angle cutoff of the surface flux estimator.
pub const DEFAULT_COSINE_CUTOFF: f64 = 0.001;

/// Flux averaged over a surface area, each crossing scoring 1/|μ|.
///
/// Crossings with |μ| below the cutoff score 2/cutoff instead, which keeps
/// the variance finite for grazing particles.
pub struct SurfaceFluxEstimator {
    base: EntityEstimator,
    cosine_cutoff: f64,
}

impl SurfaceFluxEstimator {
    /// `surface_areas` pairs each surface with its area.
    pub fn new(id: EstimatorId, multiplier: f64, surface_areas: &[(EntityId, f64)]) -> Result<Self> {
        Ok(Self {
            base: EntityEstimator::with_norm_constants(id, multiplier, surface_areas)?,
            cosine_cutoff: DEFAULT_COSINE_CUTOFF,
        })
    }

    pub fn with_cosine_cutoff(mut self, cutoff: f64) -> Result<Self> {
        if !(cutoff > 0. && cutoff <= 1.) {
            return Err(Error::InvalidParam(format!(
                "cosine cutoff must be in (0, 1], got {cutoff}"
            )));
        }
        self.cosine_cutoff = cutoff;
        Ok(self)
    }

    pub fn with_particle_types(mut self, particle_types: &[ParticleType]) -> Self {
        self.base.set_particle_types(particle_types);
        self
    }

    pub fn with_contribution_multiplier(mut self, policy: ContributionMultiplier) -> Self {
        self.base.set_contribution_multiplier(policy);
        self
    }

    pub fn with_bins(mut self, dimension: PhaseSpaceDimension, boundaries: Vec<f64>) -> Result<Self> {
        self.base.set_discretization(dimension, boundaries)?;
        Ok(self)
    }

    pub fn cosine_cutoff(&self) -> f64 {
        self.cosine_cutoff
    }

    pub fn with_response_functions(
        mut self,
        response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<Self> {
        self.base.set_response_functions(response_functions)?;
        Ok(self)
    }

    pub fn base(&self) -> &EntityEstimator {
        &self.base
    }

    /// Raw score of a crossing with direction cosine `angle_cosine`.
    pub fn crossing_contribution(&self, angle_cosine: f64) -> f64 {
        let mu = angle_cosine.abs();
        if mu < self.cosine_cutoff {
            2. / self.cosine_cutoff
        } else {
            1. / mu
        }
    }
}

impl ParticleCrossingSurfaceObserver for SurfaceFluxEstimator {
    fn update_from_particle_crossing_surface_event(
        &self,
        particle: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) {
        let values = DimensionValues::from_particle(particle).with_cosine(angle_cosine);
        let raw = self.crossing_contribution(angle_cosine);
        self.base
            .add_partial_history_contribution(surface, particle, &values, raw);
    }
}

impl EventSubscriber for SurfaceFluxEstimator {
    fn subscribe(self: Arc<Self>, registry: &mut DispatchRegistry) {
        let id = self.base.id();
        for surface in self.base.entity_ids() {
            registry
                .crossing_dispatcher()
                .attach_observer(surface, id, self.clone());
        }
    }
}

/// Gross number (or energy, with the weight-and-energy policy) of particles
/// crossing a surface.
///
/// Every crossing scores regardless of direction. Cosine bins separate
/// outward from inward crossings.
pub struct SurfaceCurrentEstimator {
    base: EntityEstimator,
}

impl SurfaceCurrentEstimator {
    pub fn new(id: EstimatorId, multiplier: f64, surfaces: &[EntityId]) -> Result<Self> {
        Ok(Self {
            base: EntityEstimator::new(id, multiplier, surfaces)?,
        })
    }

    pub fn with_particle_types(mut self, particle_types: &[ParticleType]) -> Self {
        self.base.set_particle_types(particle_types);
        self
    }

    pub fn with_contribution_multiplier(mut self, policy: ContributionMultiplier) -> Self {
        self.base.set_contribution_multiplier(policy);
        self
    }

    pub fn with_bins(mut self, dimension: PhaseSpaceDimension, boundaries: Vec<f64>) -> Result<Self> {
        self.base.set_discretization(dimension, boundaries)?;
        Ok(self)
    }

    pub fn with_response_functions(
        mut self,
        response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<Self> {
        self.base.set_response_functions(response_functions)?;
        Ok(self)
    }

    pub fn base(&self) -> &EntityEstimator {
        &self.base
    }
}

impl ParticleCrossingSurfaceObserver for SurfaceCurrentEstimator {
    fn update_from_particle_crossing_surface_event(
        &self,
        particle: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) {
        let values = DimensionValues::from_particle(particle).with_cosine(angle_cosine);
        self.base
            .add_partial_history_contribution(surface, particle, &values, 1.);
    }
}

impl EventSubscriber for SurfaceCurrentEstimator {
    fn subscribe(self: Arc<Self>, registry: &mut DispatchRegistry) {
        let id = self.base.id();
        for surface in self.base.entity_ids() {
            registry
                .crossing_dispatcher()
                .attach_observer(surface, id, self.clone());
        }
    }
}

impl_entity_estimator!(SurfaceFluxEstimator, "Surface Flux Estimator", "Surface");
impl_entity_estimator!(SurfaceCurrentEstimator, "Surface Current Estimator", "Surface");
