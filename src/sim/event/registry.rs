use crate::sim::event::{
    EstimatorId, EventDispatcher, EventKind, ParticleCollidingInCellObserver,
    ParticleCrossingSurfaceObserver, ParticleEnteringCellObserver, ParticleGenerationObserver,
    ParticleLeavingCellObserver, ParticleSubtrackEndingInCellObserver,
};
use crate::sim::particle::{EntityId, ParticleState};

/// Routes transport events to the observers attached per entity.
///
/// Populated while estimators are registered and read-only while histories
/// run, so it can be shared by all workers without locking.
#[derive(Default)]
pub struct DispatchRegistry {
    generation: EventDispatcher<dyn ParticleGenerationObserver>,
    crossing: EventDispatcher<dyn ParticleCrossingSurfaceObserver>,
    entering: EventDispatcher<dyn ParticleEnteringCellObserver>,
    leaving: EventDispatcher<dyn ParticleLeavingCellObserver>,
    subtrack_ending: EventDispatcher<dyn ParticleSubtrackEndingInCellObserver>,
    colliding: EventDispatcher<dyn ParticleCollidingInCellObserver>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation_dispatcher(&mut self) -> &mut EventDispatcher<dyn ParticleGenerationObserver> {
        &mut self.generation
    }

    pub fn crossing_dispatcher(
        &mut self,
    ) -> &mut EventDispatcher<dyn ParticleCrossingSurfaceObserver> {
        &mut self.crossing
    }

    pub fn entering_dispatcher(&mut self) -> &mut EventDispatcher<dyn ParticleEnteringCellObserver> {
        &mut self.entering
    }

    pub fn leaving_dispatcher(&mut self) -> &mut EventDispatcher<dyn ParticleLeavingCellObserver> {
        &mut self.leaving
    }

    pub fn subtrack_ending_dispatcher(
        &mut self,
    ) -> &mut EventDispatcher<dyn ParticleSubtrackEndingInCellObserver> {
        &mut self.subtrack_ending
    }

    pub fn colliding_dispatcher(
        &mut self,
    ) -> &mut EventDispatcher<dyn ParticleCollidingInCellObserver> {
        &mut self.colliding
    }

    /// Number of observers of `kind` attached to `entity`.
    pub fn number_of_observers(&self, kind: EventKind, entity: EntityId) -> usize {
        match kind {
            EventKind::Generation => Self::count(&self.generation, entity),
            EventKind::Crossing => Self::count(&self.crossing, entity),
            EventKind::EnteringCell => Self::count(&self.entering, entity),
            EventKind::LeavingCell => Self::count(&self.leaving, entity),
            EventKind::SubtrackEndingInCell => Self::count(&self.subtrack_ending, entity),
            EventKind::CollidingInCell => Self::count(&self.colliding, entity),
        }
    }

    fn count<O: ?Sized>(dispatcher: &EventDispatcher<O>, entity: EntityId) -> usize {
        dispatcher
            .entity_dispatcher(entity)
            .map(|d| d.number_of_observers())
            .unwrap_or(0)
    }

    /// Detaches an estimator from one entity for one event kind.
    pub fn detach_observer(&mut self, kind: EventKind, entity: EntityId, id: EstimatorId) {
        match kind {
            EventKind::Generation => self.generation.detach_observer(entity, id),
            EventKind::Crossing => self.crossing.detach_observer(entity, id),
            EventKind::EnteringCell => self.entering.detach_observer(entity, id),
            EventKind::LeavingCell => self.leaving.detach_observer(entity, id),
            EventKind::SubtrackEndingInCell => self.subtrack_ending.detach_observer(entity, id),
            EventKind::CollidingInCell => self.colliding.detach_observer(entity, id),
        }
    }

    /// Detaches an estimator from every entity of every event kind.
    pub fn detach_estimator(&mut self, id: EstimatorId) {
        self.generation.detach_observer_from_all_entities(id);
        self.crossing.detach_observer_from_all_entities(id);
        self.entering.detach_observer_from_all_entities(id);
        self.leaving.detach_observer_from_all_entities(id);
        self.subtrack_ending.detach_observer_from_all_entities(id);
        self.colliding.detach_observer_from_all_entities(id);
    }

    /// Removes every dispatcher (used between independent runs).
    pub fn reset(&mut self) {
        self.generation.clear();
        self.crossing.clear();
        self.entering.clear();
        self.leaving.clear();
        self.subtrack_ending.clear();
        self.colliding.clear();
    }

    pub fn dispatch_particle_generation_event(&self, particle: &ParticleState, cell: EntityId) {
        self.generation
            .dispatch(cell, |o| o.update_from_particle_generation_event(particle, cell));
    }

    pub fn dispatch_particle_crossing_surface_event(
        &self,
        particle: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) {
        self.crossing.dispatch(surface, |o| {
            o.update_from_particle_crossing_surface_event(particle, surface, angle_cosine)
        });
    }

    pub fn dispatch_particle_entering_cell_event(&self, particle: &ParticleState, cell: EntityId) {
        self.entering
            .dispatch(cell, |o| o.update_from_particle_entering_cell_event(particle, cell));
    }

    pub fn dispatch_particle_leaving_cell_event(&self, particle: &ParticleState, cell: EntityId) {
        self.leaving
            .dispatch(cell, |o| o.update_from_particle_leaving_cell_event(particle, cell));
    }

    pub fn dispatch_particle_subtrack_ending_in_cell_event(
        &self,
        particle: &ParticleState,
        cell: EntityId,
        track_length: f64,
    ) {
        self.subtrack_ending.dispatch(cell, |o| {
            o.update_from_particle_subtrack_ending_in_cell_event(particle, cell, track_length)
        });
    }

    pub fn dispatch_particle_colliding_in_cell_event(
        &self,
        particle: &ParticleState,
        cell: EntityId,
        inverse_total_cross_section: f64,
    ) {
        self.colliding.dispatch(cell, |o| {
            o.update_from_particle_colliding_in_cell_event(
                particle,
                cell,
                inverse_total_cross_section,
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::particle::ParticleType;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        crossings: Mutex<Vec<(EntityId, f64)>>,
        tracks: Mutex<Vec<(EntityId, f64)>>,
    }

    impl ParticleCrossingSurfaceObserver for Recorder {
        fn update_from_particle_crossing_surface_event(
            &self,
            _particle: &ParticleState,
            surface: EntityId,
            angle_cosine: f64,
        ) {
            self.crossings.lock().push((surface, angle_cosine));
        }
    }

    impl ParticleSubtrackEndingInCellObserver for Recorder {
        fn update_from_particle_subtrack_ending_in_cell_event(
            &self,
            _particle: &ParticleState,
            cell: EntityId,
            track_length: f64,
        ) {
            self.tracks.lock().push((cell, track_length));
        }
    }

    #[test]
    fn test_dispatch_reaches_attached_entity_only() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = DispatchRegistry::new();
        registry.crossing_dispatcher().attach_observer(5, 0, recorder.clone());
        registry.subtrack_ending_dispatcher().attach_observer(1, 0, recorder.clone());

        let p = ParticleState::new(0, ParticleType::Photon);
        registry.dispatch_particle_crossing_surface_event(&p, 5, 0.5);
        registry.dispatch_particle_crossing_surface_event(&p, 6, 0.5);
        registry.dispatch_particle_subtrack_ending_in_cell_event(&p, 1, 2.0);
        registry.dispatch_particle_colliding_in_cell_event(&p, 1, 1.0);

        assert_eq!(recorder.crossings.lock().as_slice(), &[(5, 0.5)]);
        assert_eq!(recorder.tracks.lock().as_slice(), &[(1, 2.0)]);
    }

    #[test]
    fn test_attach_same_pair_twice() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = DispatchRegistry::new();
        registry.crossing_dispatcher().attach_observer(5, 3, recorder.clone());
        registry.crossing_dispatcher().attach_observer(5, 3, recorder.clone());
        assert_eq!(registry.number_of_observers(EventKind::Crossing, 5), 1);
        assert_eq!(registry.number_of_observers(EventKind::Generation, 5), 0);
    }

    #[test]
    fn test_detach_estimator_and_reset() {
        let recorder = Arc::new(Recorder::default());
        let mut registry = DispatchRegistry::new();
        registry.crossing_dispatcher().attach_observer(5, 3, recorder.clone());
        registry.subtrack_ending_dispatcher().attach_observer(1, 3, recorder.clone());
        registry.subtrack_ending_dispatcher().attach_observer(2, 4, recorder.clone());

        // Missing pairs are ignored
        registry.detach_observer(EventKind::Crossing, 5, 42);
        registry.detach_observer(EventKind::LeavingCell, 9, 3);
        assert_eq!(registry.number_of_observers(EventKind::Crossing, 5), 1);

        registry.detach_estimator(3);
        assert_eq!(registry.number_of_observers(EventKind::Crossing, 5), 0);
        assert_eq!(registry.number_of_observers(EventKind::SubtrackEndingInCell, 1), 0);
        assert_eq!(registry.number_of_observers(EventKind::SubtrackEndingInCell, 2), 1);

        registry.reset();
        assert_eq!(registry.number_of_observers(EventKind::SubtrackEndingInCell, 2), 0);
    }
}
