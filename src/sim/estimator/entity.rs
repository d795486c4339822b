//! Per-entity, per-bin moment accumulation shared by every estimator type.

use crate::error::{Error, Result};
use crate::sim::estimator::discretization::{
    BinBoundaries, DimensionValues, PhaseSpaceDimension, PhaseSpaceDiscretization,
};
use crate::sim::estimator::moments::{FourMoments, ProcessedMoments};
use crate::sim::estimator::multiplier::ContributionMultiplier;
use crate::sim::estimator::response::{ParticleResponse, UnitResponse};
use crate::sim::estimator::RunStatistics;
use crate::sim::estimator::worker::PerWorker;
use crate::sim::event::EstimatorId;
use crate::sim::particle::{EntityId, ParticleState, ParticleType};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::sync::Arc;

/// Uncommitted contributions of the history running on one worker.
#[derive(Debug, Default)]
struct HistoryTracker {
    contributions: BTreeMap<(EntityId, usize), f64>,
}

/// Committed moments. Bin vectors hold `bins * responses` entries with
/// the response function varying slowest; totals hold one per response.
#[derive(Debug, Default)]
struct CommittedMoments {
    entity_bins: BTreeMap<EntityId, Vec<FourMoments>>,
    entity_totals: BTreeMap<EntityId, Vec<FourMoments>>,
    total_bins: Vec<FourMoments>,
    total: Vec<FourMoments>,
}

/// Uncommitted scores of one history, ready to be folded into the moments.
///
/// `bin_totals` and `totals` are the all-entity scores. They are usually
/// the sums of `entity_bins`, but estimators whose all-entity score is not
/// additive (pulse height) supply them directly.
#[derive(Debug, Default)]
pub(crate) struct HistoryScores {
    pub entity_bins: BTreeMap<(EntityId, usize), f64>,
    pub bin_totals: BTreeMap<usize, f64>,
    pub totals: Vec<f64>,
}

/// Moment engine of an estimator assigned to a set of cells or surfaces.
///
/// Contributions are first accumulated per history on the calling worker
/// and folded into the shared moments by
/// [`commit_history_contribution`](Self::commit_history_contribution), so
/// each history yields one independent sample per (entity, bin, response).
pub struct EntityEstimator {
    id: EstimatorId,
    multiplier: f64,
    entity_norms: BTreeMap<EntityId, f64>,
    total_norm: f64,
    particle_types: BTreeSet<ParticleType>,
    discretization: PhaseSpaceDiscretization,
    contribution_multiplier: ContributionMultiplier,
    response_functions: Vec<Arc<dyn ParticleResponse>>,
    committed: Mutex<CommittedMoments>,
    trackers: PerWorker<HistoryTracker>,
}

impl EntityEstimator {
    /// Creates an estimator with a unit normalization constant per entity.
    pub fn new(id: EstimatorId, multiplier: f64, entities: &[EntityId]) -> Result<Self> {
        let norms: Vec<(EntityId, f64)> = entities.iter().map(|&e| (e, 1.)).collect();
        Self::with_norm_constants(id, multiplier, &norms)
    }

    /// Creates an estimator with explicit normalization constants (volumes or areas).
    pub fn with_norm_constants(
        id: EstimatorId,
        multiplier: f64,
        entity_norms: &[(EntityId, f64)],
    ) -> Result<Self> {
        if !multiplier.is_finite() || multiplier <= 0. {
            return Err(Error::InvalidParam(format!(
                "estimator {id}: multiplier must be positive, got {multiplier}"
            )));
        }
        if entity_norms.is_empty() {
            return Err(Error::InvalidParam(format!(
                "estimator {id}: at least one entity is required"
            )));
        }

        let mut norms = BTreeMap::new();
        for &(entity, norm) in entity_norms {
            if !norm.is_finite() || norm <= 0. {
                return Err(Error::InvalidParam(format!(
                    "estimator {id}: entity {entity} has invalid normalization constant {norm}"
                )));
            }
            if norms.insert(entity, norm).is_some() {
                return Err(Error::InvalidParam(format!(
                    "estimator {id}: entity {entity} assigned twice"
                )));
            }
        }
        let total_norm = norms.values().sum();

        Ok(Self {
            id,
            multiplier,
            entity_norms: norms,
            total_norm,
            particle_types: ParticleType::ALL.into_iter().collect(),
            discretization: PhaseSpaceDiscretization::new(),
            contribution_multiplier: ContributionMultiplier::Weight,
            response_functions: vec![Arc::new(UnitResponse) as Arc<dyn ParticleResponse>],
            committed: Mutex::new(CommittedMoments::default()),
            trackers: PerWorker::new(),
        })
    }

    /// Restricts scoring to `particle_types` (every type scores by default).
    pub fn set_particle_types(&mut self, particle_types: &[ParticleType]) {
        self.particle_types = particle_types.iter().copied().collect();
    }

    pub fn set_contribution_multiplier(&mut self, policy: ContributionMultiplier) {
        self.contribution_multiplier = policy;
    }

    /// Sets the bins of one dimension. Committed data is discarded.
    pub fn set_discretization(
        &mut self,
        dimension: PhaseSpaceDimension,
        boundaries: Vec<f64>,
    ) -> Result<()> {
        let boundaries = BinBoundaries::new(boundaries)?;
        self.discretization.set_dimension(dimension, boundaries);
        self.reset_data();
        Ok(())
    }

    /// Replaces the response functions (a single unit response by default).
    /// Committed data is discarded.
    pub fn set_response_functions(
        &mut self,
        response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<()> {
        if response_functions.is_empty() {
            return Err(Error::InvalidParam(format!(
                "estimator {}: at least one response function is required",
                self.id
            )));
        }
        self.response_functions = response_functions;
        self.reset_data();
        Ok(())
    }

    pub fn id(&self) -> EstimatorId {
        self.id
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn contribution_multiplier(&self) -> ContributionMultiplier {
        self.contribution_multiplier
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entity_norms.keys().copied()
    }

    pub fn is_entity_assigned(&self, entity: EntityId) -> bool {
        self.entity_norms.contains_key(&entity)
    }

    pub fn entity_norm_constant(&self, entity: EntityId) -> Option<f64> {
        self.entity_norms.get(&entity).copied()
    }

    pub fn total_norm_constant(&self) -> f64 {
        self.total_norm
    }

    pub fn particle_types(&self) -> &BTreeSet<ParticleType> {
        &self.particle_types
    }

    pub fn is_particle_type_assigned(&self, particle_type: ParticleType) -> bool {
        self.particle_types.contains(&particle_type)
    }

    pub fn discretization(&self) -> &PhaseSpaceDiscretization {
        &self.discretization
    }

    /// Number of phase-space bins of one response function.
    pub fn number_of_bins(&self) -> usize {
        self.discretization.number_of_bins()
    }

    pub fn number_of_response_functions(&self) -> usize {
        self.response_functions.len()
    }

    pub fn response_function_name(&self, response: usize) -> Option<&str> {
        self.response_functions.get(response).map(|r| r.name())
    }

    /// Number of stored bins per entity: phase-space bins times responses.
    pub fn number_of_bins_with_responses(&self) -> usize {
        self.number_of_bins() * self.number_of_response_functions()
    }

    /// Response function of a stored bin index.
    pub fn response_function_index(&self, bin: usize) -> usize {
        bin / self.number_of_bins()
    }

    /// Adds a contribution to the history in flight on the calling worker.
    ///
    /// Silently ignored if the entity or the particle type is not assigned,
    /// or if the values fall outside the binned phase space. The stored
    /// value for response `r` is
    /// `raw * estimator multiplier * contribution multiplier * response_r`,
    /// in bin `phase-space bin + bins * r`.
    pub fn add_partial_history_contribution(
        &self,
        entity: EntityId,
        particle: &ParticleState,
        values: &DimensionValues,
        raw_contribution: f64,
    ) {
        debug_assert!(raw_contribution.is_finite(), "contribution must be finite");
        if !self.is_entity_assigned(entity)
            || !self.is_particle_type_assigned(particle.particle_type())
        {
            return;
        }
        let Some(bin) = self.discretization.calculate_bin_index(values) else {
            return;
        };
        let contribution =
            raw_contribution * self.multiplier * self.contribution_multiplier.value(particle);
        let n_bins = self.number_of_bins();
        for (r, response) in self.response_functions.iter().enumerate() {
            self.add_partial_history_contribution_to_bin(
                entity,
                bin + n_bins * r,
                contribution * response.evaluate(particle),
            );
        }
    }

    /// Adds an already scaled contribution to a known stored bin.
    pub(crate) fn add_partial_history_contribution_to_bin(
        &self,
        entity: EntityId,
        bin: usize,
        contribution: f64,
    ) {
        if !self.is_entity_assigned(entity) {
            return;
        }
        debug_assert!(bin < self.number_of_bins_with_responses());
        self.trackers.with_current(|tracker| {
            *tracker.contributions.entry((entity, bin)).or_insert(0.) += contribution;
        });
    }

    /// True if the calling worker has contributions not yet committed.
    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.trackers.with_current(|tracker| !tracker.contributions.is_empty())
    }

    /// Folds the calling worker's uncommitted contributions into the moments.
    ///
    /// All-entity scores are the sums of the entity scores.
    pub fn commit_history_contribution(&self) {
        let contributions = self
            .trackers
            .with_current(|tracker| std::mem::take(&mut tracker.contributions));
        if contributions.is_empty() {
            return;
        }

        let n_bins = self.number_of_bins();
        let mut scores = HistoryScores {
            totals: vec![0.; self.number_of_response_functions()],
            ..HistoryScores::default()
        };
        for (&(_, bin), &value) in &contributions {
            *scores.bin_totals.entry(bin).or_insert(0.) += value;
            scores.totals[bin / n_bins] += value;
        }
        scores.entity_bins = contributions;
        self.commit_history_scores(&scores);
    }

    /// Folds one history's scores into the moments.
    pub(crate) fn commit_history_scores(&self, scores: &HistoryScores) {
        let n_bins = self.number_of_bins();
        let n_responses = self.number_of_response_functions();
        let n_stored = n_bins * n_responses;
        debug_assert_eq!(scores.totals.len(), n_responses);

        let mut entity_totals: BTreeMap<EntityId, Vec<f64>> = BTreeMap::new();
        let mut committed = self.committed.lock();
        for (&(entity, bin), &value) in &scores.entity_bins {
            if value == 0. {
                continue;
            }
            committed
                .entity_bins
                .entry(entity)
                .or_insert_with(|| vec![FourMoments::default(); n_stored])[bin]
                .add_sample(value);
            entity_totals
                .entry(entity)
                .or_insert_with(|| vec![0.; n_responses])[bin / n_bins] += value;
        }

        for (entity, values) in entity_totals {
            let moments = committed
                .entity_totals
                .entry(entity)
                .or_insert_with(|| vec![FourMoments::default(); n_responses]);
            for (m, value) in moments.iter_mut().zip(values) {
                if value != 0. {
                    m.add_sample(value);
                }
            }
        }

        if committed.total_bins.len() != n_stored {
            committed.total_bins = vec![FourMoments::default(); n_stored];
        }
        for (&bin, &value) in &scores.bin_totals {
            if value != 0. {
                committed.total_bins[bin].add_sample(value);
            }
        }
        if committed.total.len() != n_responses {
            committed.total = vec![FourMoments::default(); n_responses];
        }
        for (m, &value) in committed.total.iter_mut().zip(&scores.totals) {
            if value != 0. {
                m.add_sample(value);
            }
        }
    }

    /// Makes room for `num_threads` workers with independent uncommitted state.
    pub fn enable_thread_support(&self, num_threads: usize) {
        self.trackers.ensure(num_threads);
    }

    /// Discards committed moments and every uncommitted contribution.
    pub fn reset_data(&self) {
        *self.committed.lock() = CommittedMoments::default();
        self.trackers.for_each(|tracker| tracker.contributions.clear());
    }

    /// Committed moments of every stored bin of `entity`.
    pub fn entity_bin_moments(&self, entity: EntityId) -> Option<Vec<FourMoments>> {
        if !self.is_entity_assigned(entity) {
            return None;
        }
        let committed = self.committed.lock();
        Some(
            committed
                .entity_bins
                .get(&entity)
                .cloned()
                .unwrap_or_else(|| vec![FourMoments::default(); self.number_of_bins_with_responses()]),
        )
    }

    /// Committed moments of the per-history total over all bins of
    /// `entity`, one per response function.
    pub fn entity_total_moments(&self, entity: EntityId) -> Option<Vec<FourMoments>> {
        if !self.is_entity_assigned(entity) {
            return None;
        }
        Some(
            self.committed
                .lock()
                .entity_totals
                .get(&entity)
                .cloned()
                .unwrap_or_else(|| vec![FourMoments::default(); self.number_of_response_functions()]),
        )
    }

    /// Committed moments of each stored bin over all entities.
    pub fn total_bin_moments(&self) -> Vec<FourMoments> {
        let committed = self.committed.lock();
        if committed.total_bins.is_empty() {
            vec![FourMoments::default(); self.number_of_bins_with_responses()]
        } else {
            committed.total_bins.clone()
        }
    }

    /// Committed moments of the per-history total over all entities and
    /// bins, one per response function.
    pub fn total_moments(&self) -> Vec<FourMoments> {
        let committed = self.committed.lock();
        if committed.total.is_empty() {
            vec![FourMoments::default(); self.number_of_response_functions()]
        } else {
            committed.total.clone()
        }
    }

    /// Mean, relative error, VOV and FOM of one stored bin of one entity.
    pub fn processed_entity_bin(
        &self,
        entity: EntityId,
        bin: usize,
        stats: &RunStatistics,
    ) -> Option<ProcessedMoments> {
        let norm = self.entity_norm_constant(entity)?;
        let moments = self.entity_bin_moments(entity)?;
        moments.get(bin).map(|m| Self::process(m, norm, stats))
    }

    /// Processed statistics of the total over all bins of one entity, per response.
    pub fn processed_entity_total(
        &self,
        entity: EntityId,
        stats: &RunStatistics,
    ) -> Option<Vec<ProcessedMoments>> {
        let norm = self.entity_norm_constant(entity)?;
        let moments = self.entity_total_moments(entity)?;
        Some(moments.iter().map(|m| Self::process(m, norm, stats)).collect())
    }

    /// Processed statistics of the grand total, per response.
    pub fn processed_total(&self, stats: &RunStatistics) -> Vec<ProcessedMoments> {
        self.total_moments()
            .iter()
            .map(|m| Self::process(m, self.total_norm, stats))
            .collect()
    }

    fn process(moments: &FourMoments, norm: f64, stats: &RunStatistics) -> ProcessedMoments {
        moments.process(stats.histories, 1. / norm, stats.elapsed_time)
    }

    /// Writes the standard summary: header, bins, per-entity and total data.
    pub fn print_summary(
        &self,
        os: &mut dyn Write,
        estimator_kind: &str,
        entity_kind: &str,
        stats: &RunStatistics,
    ) -> io::Result<()> {
        writeln!(os, "Estimator {}: {}", self.id, estimator_kind)?;
        writeln!(os, "  Multiplier: {}", self.multiplier)?;
        writeln!(os, "  Contribution Multiplier: {}", self.contribution_multiplier)?;
        let types: Vec<String> = self.particle_types.iter().map(|t| t.to_string()).collect();
        writeln!(os, "  Particle Types: {}", types.join(", "))?;
        let names: Vec<&str> = self.response_functions.iter().map(|r| r.name()).collect();
        writeln!(os, "  Response Functions: {}", names.join(", "))?;
        for (dimension, boundaries) in self.discretization.dimensions() {
            let values: Vec<String> = boundaries
                .boundaries()
                .iter()
                .map(|b| format!("{b:e}"))
                .collect();
            writeln!(os, "  {} Bins: {}", dimension, values.join(" "))?;
        }

        for entity in self.entity_ids() {
            let norm = self.entity_norm_constant(entity).unwrap_or(1.);
            if let Some(bins) = self.entity_bin_moments(entity) {
                writeln!(os, "  {} {} Bin Data:", entity_kind, entity)?;
                self.write_bin_data(os, &bins, norm, stats)?;
            }
            if let Some(totals) = self.processed_entity_total(entity, stats) {
                writeln!(os, "  {} {} Total Data:", entity_kind, entity)?;
                self.write_total_data(os, &totals)?;
            }
        }

        writeln!(os, "  All {}s Bin Data:", entity_kind)?;
        self.write_bin_data(os, &self.total_bin_moments(), self.total_norm, stats)?;
        writeln!(os, "  All {}s Total Data:", entity_kind)?;
        self.write_total_data(os, &self.processed_total(stats))
    }

    fn write_bin_data(
        &self,
        os: &mut dyn Write,
        bins: &[FourMoments],
        norm: f64,
        stats: &RunStatistics,
    ) -> io::Result<()> {
        let n_bins = self.number_of_bins();
        for (r, chunk) in bins.chunks(n_bins).enumerate() {
            writeln!(os, "   Response Function: {}", self.response_functions[r].name())?;
            for (bin, m) in chunk.iter().enumerate() {
                let p = Self::process(m, norm, stats);
                write_bin_line(os, &self.discretization.bin_label(bin), &p)?;
            }
        }
        Ok(())
    }

    fn write_total_data(&self, os: &mut dyn Write, totals: &[ProcessedMoments]) -> io::Result<()> {
        for (response, p) in self.response_functions.iter().zip(totals) {
            writeln!(os, "   Response Function: {}", response.name())?;
            write_total_line(os, p)?;
        }
        Ok(())
    }
}

fn write_bin_line(os: &mut dyn Write, label: &str, p: &ProcessedMoments) -> io::Result<()> {
    let label = if label.is_empty() { "Bin" } else { label };
    writeln!(os, "    {}: {:e} {:e}", label, p.mean, p.relative_error)
}

fn write_total_line(os: &mut dyn Write, p: &ProcessedMoments) -> io::Result<()> {
    writeln!(
        os,
        "    {:e} {:e} {:e} {:e}",
        p.mean, p.relative_error, p.relative_vov, p.figure_of_merit
    )
}
