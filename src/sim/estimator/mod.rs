//! Estimators (tallies) and their moment accumulation engine.
//!
//! Every estimator observes a subset of transport events for a set of
//! cells or surfaces. Scores are accumulated per history on the worker that
//! runs it and committed once the history ends.

pub mod cell;
pub mod discretization;
pub mod entity;
pub mod handler;
pub mod moments;
pub mod multiplier;
pub mod response;
pub mod surface;
pub mod worker;

use crate::sim::event::DispatchRegistry;
use std::io::{self, Write};
use std::sync::Arc;

pub use crate::sim::event::EstimatorId;
pub use cell::{CellCollisionFluxEstimator, CellPulseHeightEstimator, CellTrackLengthFluxEstimator};
pub use discretization::{DimensionValues, PhaseSpaceDimension};
pub use entity::EntityEstimator;
pub use handler::EstimatorHandler;
pub use moments::{FourMoments, ProcessedMoments};
pub use multiplier::ContributionMultiplier;
pub use response::{EnergyResponse, ParticleResponse, UnitResponse};
pub use surface::{SurfaceCurrentEstimator, SurfaceFluxEstimator};
pub use worker::worker_index;

/// Run totals needed to turn moments into statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStatistics {
    pub histories: u64,
    /// Wall-clock time of the run (s)
    pub elapsed_time: f64,
}

impl RunStatistics {
    pub fn new(histories: u64, elapsed_time: f64) -> Self {
        Self {
            histories,
            elapsed_time,
        }
    }
}

/// Common interface of all estimators held by an [`EstimatorHandler`].
pub trait Estimator: Send + Sync {
    fn id(&self) -> EstimatorId;

    /// True if the calling worker has scores not yet committed.
    fn has_uncommitted_history_contribution(&self) -> bool;

    /// Folds the calling worker's history scores into the moments.
    fn commit_history_contribution(&self);

    fn enable_thread_support(&self, num_threads: usize);

    fn reset_data(&self);

    fn print_summary(&self, os: &mut dyn Write, stats: &RunStatistics) -> io::Result<()>;
}

/// Attaches an estimator to the events and entities it observes.
pub trait EventSubscriber {
    fn subscribe(self: Arc<Self>, registry: &mut DispatchRegistry);
}
