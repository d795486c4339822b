//! Seams between the transport loop and its collaborators.
//!
//! The transport loop is written against the [`Geometry`], [`Collision`]
//! and [`Source`] traits only; concrete backends are chosen at run time.
//! Estimators and event routing live in an explicit [`SimulationContext`].

pub mod context;
pub mod module;

pub use context::SimulationContext;
pub use module::{
    Collision, Geometry, HistoryRng, Source, SurfaceHit, history_rng, sample_isotropic_direction,
};
