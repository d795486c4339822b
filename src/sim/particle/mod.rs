//! Particle records and the per-worker banks that hold them.

pub mod bank;
pub mod state;

pub use bank::{Bank, ParticleBank, ReactionSortedBank, ReactionTag};
pub use state::{HistoryNumber, ParticleState, ParticleType};

/// Identifier of a geometric entity (cell or surface).
pub type EntityId = u64;
