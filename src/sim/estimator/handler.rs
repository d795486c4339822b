use crate::error::{Error, Result};
use crate::sim::estimator::{Estimator, EstimatorId, EventSubscriber, RunStatistics};
use crate::sim::event::DispatchRegistry;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

/// Owns the estimators of a simulation.
#[derive(Default)]
pub struct EstimatorHandler {
    estimators: BTreeMap<EstimatorId, Arc<dyn Estimator>>,
}

impl EstimatorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an estimator and attaches it to the events it observes.
    ///
    /// Estimator ids must be unique.
    pub fn add_estimator<E>(&mut self, registry: &mut DispatchRegistry, estimator: Arc<E>) -> Result<()>
    where
        E: Estimator + EventSubscriber + 'static,
    {
        let id = estimator.id();
        if self.estimators.contains_key(&id) {
            return Err(Error::Config(format!("estimator id {id} is already in use")));
        }
        estimator.clone().subscribe(registry);
        self.estimators.insert(id, estimator);
        Ok(())
    }

    /// Removes an estimator and detaches it from every event.
    pub fn remove_estimator(
        &mut self,
        registry: &mut DispatchRegistry,
        id: EstimatorId,
    ) -> Option<Arc<dyn Estimator>> {
        registry.detach_estimator(id);
        self.estimators.remove(&id)
    }

    pub fn estimator(&self, id: EstimatorId) -> Option<&Arc<dyn Estimator>> {
        self.estimators.get(&id)
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }

    /// Commits the calling worker's history scores of every estimator.
    pub fn commit_history_contributions(&self) {
        for estimator in self.estimators.values() {
            estimator.commit_history_contribution();
        }
    }

    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.estimators
            .values()
            .any(|e| e.has_uncommitted_history_contribution())
    }

    pub fn enable_thread_support(&self, num_threads: usize) {
        for estimator in self.estimators.values() {
            estimator.enable_thread_support(num_threads);
        }
    }

    pub fn reset_data(&self) {
        for estimator in self.estimators.values() {
            estimator.reset_data();
        }
    }

    /// Drops every estimator.
    pub fn clear(&mut self) {
        self.estimators.clear();
    }

    pub fn print_summaries(&self, os: &mut dyn Write, stats: &RunStatistics) -> io::Result<()> {
        for estimator in self.estimators.values() {
            estimator.print_summary(os, stats)?;
            writeln!(os)?;
        }
        Ok(())
    }
}
