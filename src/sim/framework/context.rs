use crate::error::Result;
use crate::sim::estimator::{Estimator, EstimatorHandler, EstimatorId, EventSubscriber};
use crate::sim::event::DispatchRegistry;
use std::sync::Arc;

/// Event routing and estimators of one simulation.
///
/// Built before a run and shared read-only by all workers while histories
/// run. Call [`reset`](Self::reset) to reuse it for an independent run.
#[derive(Default)]
pub struct SimulationContext {
    registry: DispatchRegistry,
    estimators: EstimatorHandler,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DispatchRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DispatchRegistry {
        &mut self.registry
    }

    pub fn estimators(&self) -> &EstimatorHandler {
        &self.estimators
    }

    /// Registers an estimator and attaches it to the events it observes.
    pub fn add_estimator<E>(&mut self, estimator: Arc<E>) -> Result<()>
    where
        E: Estimator + EventSubscriber + 'static,
    {
        self.estimators.add_estimator(&mut self.registry, estimator)
    }

    pub fn remove_estimator(&mut self, id: EstimatorId) -> Option<Arc<dyn Estimator>> {
        self.estimators.remove_estimator(&mut self.registry, id)
    }

    /// Commits the calling worker's scores of the history that just ended.
    pub fn commit_history_contributions(&self) {
        self.estimators.commit_history_contributions();
    }

    /// Removes every estimator and every event dispatcher.
    pub fn reset(&mut self) {
        self.estimators.clear();
        self.registry.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::estimator::SurfaceCurrentEstimator;
    use crate::sim::event::EventKind;
    use crate::sim::particle::{ParticleState, ParticleType};

    #[test]
    fn test_add_estimator_attaches_to_registry() {
        let mut ctx = SimulationContext::new();
        let e = Arc::new(
            SurfaceCurrentEstimator::new(0, 1., &[3])
                .unwrap()
                .with_particle_types(&[ParticleType::Photon]),
        );
        ctx.add_estimator(e.clone()).unwrap();
        assert_eq!(ctx.registry().number_of_observers(EventKind::Crossing, 3), 1);

        let p = ParticleState::new(0, ParticleType::Photon);
        ctx.registry()
            .dispatch_particle_crossing_surface_event(&p, 3, 1.);
        ctx.commit_history_contributions();
        assert!((e.base().total_moments()[0].first - 1.).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut ctx = SimulationContext::new();
        let e = Arc::new(SurfaceCurrentEstimator::new(0, 1., &[3]).unwrap());
        ctx.add_estimator(e).unwrap();
        ctx.reset();
        assert!(ctx.estimators().is_empty());
        assert_eq!(ctx.registry().number_of_observers(EventKind::Crossing, 3), 0);

        // Ids can be reused after a reset
        let e = Arc::new(SurfaceCurrentEstimator::new(0, 1., &[3]).unwrap());
        assert!(ctx.add_estimator(e).is_ok());
        assert!(ctx.remove_estimator(0).is_some());
    }
}
