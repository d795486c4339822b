//! Estimators scored inside cells.

use crate::error::{Error, Result};
use crate::sim::estimator::discretization::{DimensionValues, PhaseSpaceDimension};
use crate::sim::estimator::entity::{EntityEstimator, HistoryScores};
use crate::sim::estimator::response::ParticleResponse;
use crate::sim::estimator::multiplier::ContributionMultiplier;
use crate::sim::estimator::worker::PerWorker;
use crate::sim::estimator::{Estimator, EstimatorId, EventSubscriber, RunStatistics};
use crate::sim::event::{
    DispatchRegistry, ParticleCollidingInCellObserver, ParticleEnteringCellObserver,
    ParticleGenerationObserver, ParticleLeavingCellObserver,
    ParticleSubtrackEndingInCellObserver,
};
use crate::sim::particle::{EntityId, ParticleState, ParticleType};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

fn check_cell_dimension(dimension: PhaseSpaceDimension) -> Result<()> {
    if dimension == PhaseSpaceDimension::Cosine {
        return Err(Error::InvalidParam(
            "cosine bins are only supported by surface estimators".to_string(),
        ));
    }
    Ok(())
}

/// Flux averaged over a cell volume from the track lengths inside it.
pub struct CellTrackLengthFluxEstimator {
    base: EntityEstimator,
}

impl CellTrackLengthFluxEstimator {
    /// `cell_volumes` pairs each cell with its volume.
    pub fn new(id: EstimatorId, multiplier: f64, cell_volumes: &[(EntityId, f64)]) -> Result<Self> {
        Ok(Self {
            base: EntityEstimator::with_norm_constants(id, multiplier, cell_volumes)?,
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
        check_cell_dimension(dimension)?;
        self.base.set_discretization(dimension, boundaries)?;
        Ok(self)
    }

    /// One set of moments is kept per response function.
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

impl ParticleSubtrackEndingInCellObserver for CellTrackLengthFluxEstimator {
    fn update_from_particle_subtrack_ending_in_cell_event(
        &self,
        particle: &ParticleState,
        cell: EntityId,
        track_length: f64,
    ) {
        let values = DimensionValues::from_particle(particle);
        self.base
            .add_partial_history_contribution(cell, particle, &values, track_length);
    }
}

impl EventSubscriber for CellTrackLengthFluxEstimator {
    fn subscribe(self: Arc<Self>, registry: &mut DispatchRegistry) {
        let id = self.base.id();
        for cell in self.base.entity_ids() {
            registry
                .subtrack_ending_dispatcher()
                .attach_observer(cell, id, self.clone());
        }
    }
}

/// Flux in a cell estimated from collisions, each scoring 1/Σt.
pub struct CellCollisionFluxEstimator {
    base: EntityEstimator,
}

impl CellCollisionFluxEstimator {
    pub fn new(id: EstimatorId, multiplier: f64, cell_volumes: &[(EntityId, f64)]) -> Result<Self> {
        Ok(Self {
            base: EntityEstimator::with_norm_constants(id, multiplier, cell_volumes)?,
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
        check_cell_dimension(dimension)?;
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

impl ParticleCollidingInCellObserver for CellCollisionFluxEstimator {
    fn update_from_particle_colliding_in_cell_event(
        &self,
        particle: &ParticleState,
        cell: EntityId,
        inverse_total_cross_section: f64,
    ) {
        let values = DimensionValues::from_particle(particle);
        self.base.add_partial_history_contribution(
            cell,
            particle,
            &values,
            inverse_total_cross_section,
        );
    }
}

impl EventSubscriber for CellCollisionFluxEstimator {
    fn subscribe(self: Arc<Self>, registry: &mut DispatchRegistry) {
        let id = self.base.id();
        for cell in self.base.entity_ids() {
            registry
                .colliding_dispatcher()
                .attach_observer(cell, id, self.clone());
        }
    }
}

/// Distribution of the energy deposited per history in each cell.
///
/// Weighted energy is added when a particle is generated in or enters a
/// cell and subtracted when it leaves. At commit time each touched cell
/// scores once in the energy bin of its net deposition: 1 with the weight
/// policy, the deposited energy with the weight-and-energy policy. The
/// all-cells data scores the summed deposition of the history once.
///
/// Response functions cannot be assigned to this estimator.
pub struct CellPulseHeightEstimator {
    base: EntityEstimator,
    depositions: PerWorker<BTreeMap<EntityId, f64>>,
}

impl CellPulseHeightEstimator {
    pub fn new(id: EstimatorId, multiplier: f64, cells: &[EntityId]) -> Result<Self> {
        Ok(Self {
            base: EntityEstimator::new(id, multiplier, cells)?,
            depositions: PerWorker::new(),
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

    /// Bins of deposited energy. Only the energy dimension is supported.
    pub fn with_energy_bins(mut self, boundaries: Vec<f64>) -> Result<Self> {
        self.base
            .set_discretization(PhaseSpaceDimension::Energy, boundaries)?;
        Ok(self)
    }

    pub fn base(&self) -> &EntityEstimator {
        &self.base
    }

    fn add_energy(&self, particle: &ParticleState, cell: EntityId, sign: f64) {
        if !self.base.is_entity_assigned(cell)
            || !self.base.is_particle_type_assigned(particle.particle_type())
        {
            return;
        }
        let energy = sign * particle.weight() * particle.energy();
        self.depositions
            .with_current(|d| *d.entry(cell).or_insert(0.) += energy);
    }

    /// Bin and scaled score of a pulse of `deposited` MeV.
    fn pulse_score(&self, deposited: f64) -> Option<(usize, f64)> {
        let deposited = deposited.max(0.);
        let bin = self
            .base
            .discretization()
            .calculate_bin_index_for(PhaseSpaceDimension::Energy, deposited)?;
        let score = match self.base.contribution_multiplier() {
            ContributionMultiplier::Weight => 1.,
            ContributionMultiplier::WeightAndEnergy => deposited,
        };
        Some((bin, score * self.base.multiplier()))
    }
}

impl ParticleGenerationObserver for CellPulseHeightEstimator {
    fn update_from_particle_generation_event(&self, particle: &ParticleState, cell: EntityId) {
        self.add_energy(particle, cell, 1.);
    }
}

impl ParticleEnteringCellObserver for CellPulseHeightEstimator {
    fn update_from_particle_entering_cell_event(&self, particle: &ParticleState, cell: EntityId) {
        self.add_energy(particle, cell, 1.);
    }
}

impl ParticleLeavingCellObserver for CellPulseHeightEstimator {
    fn update_from_particle_leaving_cell_event(&self, particle: &ParticleState, cell: EntityId) {
        self.add_energy(particle, cell, -1.);
    }
}

impl EventSubscriber for CellPulseHeightEstimator {
    fn subscribe(self: Arc<Self>, registry: &mut DispatchRegistry) {
        let id = self.base.id();
        for cell in self.base.entity_ids() {
            registry
                .generation_dispatcher()
                .attach_observer(cell, id, self.clone());
            registry
                .entering_dispatcher()
                .attach_observer(cell, id, self.clone());
            registry
                .leaving_dispatcher()
                .attach_observer(cell, id, self.clone());
        }
    }
}

/// Estimators whose whole protocol lives in their `base` entity estimator.
macro_rules! impl_entity_estimator {
    ($estimator:ty, $name:expr, $entity_kind:expr) => {
        impl $crate::sim::estimator::Estimator for $estimator {
            fn id(&self) -> $crate::sim::estimator::EstimatorId {
                self.base.id()
            }

            fn has_uncommitted_history_contribution(&self) -> bool {
                self.base.has_uncommitted_history_contribution()
            }

            fn commit_history_contribution(&self) {
                self.base.commit_history_contribution();
            }

            fn enable_thread_support(&self, num_threads: usize) {
                self.base.enable_thread_support(num_threads);
            }

            fn reset_data(&self) {
                self.base.reset_data();
            }

            fn print_summary(
                &self,
                os: &mut dyn std::io::Write,
                stats: &$crate::sim::estimator::RunStatistics,
            ) -> std::io::Result<()> {
                self.base.print_summary(os, $name, $entity_kind, stats)
            }
        }
    };
}

pub(crate) use impl_entity_estimator;

impl_entity_estimator!(CellTrackLengthFluxEstimator, "Cell Track-Length Flux Estimator", "Cell");
impl_entity_estimator!(CellCollisionFluxEstimator, "Cell Collision Flux Estimator", "Cell");

impl Estimator for CellPulseHeightEstimator {
    fn id(&self) -> EstimatorId {
        self.base.id()
    }

    fn has_uncommitted_history_contribution(&self) -> bool {
        self.depositions.with_current(|d| !d.is_empty())
    }

    fn commit_history_contribution(&self) {
        let depositions = self.depositions.with_current(std::mem::take);
        if depositions.is_empty() {
            return;
        }

        let mut scores = HistoryScores {
            totals: vec![0.],
            ..HistoryScores::default()
        };
        for (&cell, &deposited) in &depositions {
            if let Some((bin, score)) = self.pulse_score(deposited) {
                scores.entity_bins.insert((cell, bin), score);
            }
        }
        // All cells form one detector: the history's summed deposition is one pulse
        let deposited: f64 = depositions.values().sum();
        if let Some((bin, score)) = self.pulse_score(deposited) {
            scores.bin_totals.insert(bin, score);
            scores.totals[0] = score;
        }
        self.base.commit_history_scores(&scores);
    }

    fn enable_thread_support(&self, num_threads: usize) {
        self.depositions.ensure(num_threads);
        self.base.enable_thread_support(num_threads);
    }

    fn reset_data(&self) {
        self.depositions.for_each(|d| d.clear());
        self.base.reset_data();
    }

    fn print_summary(&self, os: &mut dyn Write, stats: &RunStatistics) -> io::Result<()> {
        self.base
            .print_summary(os, "Cell Pulse Height Estimator", "Cell", stats)
    }
}
