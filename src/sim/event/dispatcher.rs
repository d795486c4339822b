use crate::sim::event::EstimatorId;
use crate::sim::particle::EntityId;
use std::collections::HashMap;
use std::sync::Arc;

/// Observers of one event kind attached to a single entity.
///
/// Estimator ids are unique within a dispatcher.
pub struct EntityEventDispatcher<O: ?Sized> {
    entity: EntityId,
    observers: HashMap<EstimatorId, Arc<O>>,
}

impl<O: ?Sized> EntityEventDispatcher<O> {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            observers: HashMap::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Attaches an observer. Re-attaching an existing id keeps the first observer.
    pub fn attach_observer(&mut self, id: EstimatorId, observer: Arc<O>) {
        self.observers.entry(id).or_insert(observer);
    }

    /// Detaches an observer. Unknown ids are ignored.
    pub fn detach_observer(&mut self, id: EstimatorId) {
        self.observers.remove(&id);
    }

    pub fn is_attached(&self, id: EstimatorId) -> bool {
        self.observers.contains_key(&id)
    }

    pub fn number_of_observers(&self) -> usize {
        self.observers.len()
    }

    /// Calls `update` for every attached observer (in no particular order).
    pub fn dispatch(&self, mut update: impl FnMut(&O)) {
        for observer in self.observers.values() {
            update(&**observer);
        }
    }
}

/// Per-entity dispatchers of one event kind, created on first attach.
pub struct EventDispatcher<O: ?Sized> {
    dispatchers: HashMap<EntityId, EntityEventDispatcher<O>>,
}

impl<O: ?Sized> EventDispatcher<O> {
    pub fn new() -> Self {
        Self {
            dispatchers: HashMap::new(),
        }
    }

    /// Returns the dispatcher of `entity`, creating it if needed.
    pub fn entity_dispatcher_mut(&mut self, entity: EntityId) -> &mut EntityEventDispatcher<O> {
        self.dispatchers
            .entry(entity)
            .or_insert_with(|| EntityEventDispatcher::new(entity))
    }

    pub fn entity_dispatcher(&self, entity: EntityId) -> Option<&EntityEventDispatcher<O>> {
        self.dispatchers.get(&entity)
    }

    pub fn attach_observer(&mut self, entity: EntityId, id: EstimatorId, observer: Arc<O>) {
        self.entity_dispatcher_mut(entity).attach_observer(id, observer);
    }

    pub fn detach_observer(&mut self, entity: EntityId, id: EstimatorId) {
        if let Some(dispatcher) = self.dispatchers.get_mut(&entity) {
            dispatcher.detach_observer(id);
        }
    }

    /// Detaches `id` from every entity.
    pub fn detach_observer_from_all_entities(&mut self, id: EstimatorId) {
        for dispatcher in self.dispatchers.values_mut() {
            dispatcher.detach_observer(id);
        }
    }

    /// Forwards an event to the observers of `entity`.
    ///
    /// Does nothing if no observer was ever attached to the entity.
    pub fn dispatch(&self, entity: EntityId, update: impl FnMut(&O)) {
        if let Some(dispatcher) = self.dispatchers.get(&entity) {
            dispatcher.dispatch(update);
        }
    }

    pub fn number_of_dispatchers(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn clear(&mut self) {
        self.dispatchers.clear();
    }
}

impl<O: ?Sized> Default for EventDispatcher<O> {
    fn default() -> Self {
        Self::new()
    }
}
