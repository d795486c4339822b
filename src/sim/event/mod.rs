//! Event dispatch between the transport loop and the estimators.
//!
//! The transport loop reports six kinds of physical events, each scoped to
//! a cell or a surface. Estimators implement the observer trait of each
//! event kind they care about and are attached per entity in the
//! [`DispatchRegistry`].

pub mod dispatcher;
pub mod observer;
pub mod registry;

pub use dispatcher::{EntityEventDispatcher, EventDispatcher};
pub use observer::{
    ParticleCollidingInCellObserver, ParticleCrossingSurfaceObserver,
    ParticleEnteringCellObserver, ParticleGenerationObserver, ParticleLeavingCellObserver,
    ParticleSubtrackEndingInCellObserver,
};
pub use registry::DispatchRegistry;

/// Identifier of an estimator (unique within a simulation context).
pub type EstimatorId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Particle created or started in a cell.
    Generation,
    /// Particle crosses a surface (carries the angle cosine).
    Crossing,
    EnteringCell,
    LeavingCell,
    /// A sub-track ends in a cell (carries the track length).
    SubtrackEndingInCell,
    /// Particle collides in a cell (carries 1/Σt).
    CollidingInCell,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Generation,
        EventKind::Crossing,
        EventKind::EnteringCell,
        EventKind::LeavingCell,
        EventKind::SubtrackEndingInCell,
        EventKind::CollidingInCell,
    ];
}
