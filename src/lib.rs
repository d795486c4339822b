pub mod error;
pub mod geom;
pub mod sim;

// Prelude
pub use error::{Error, LostParticle, Result};
pub use geom::point::Point;
pub use geom::ray::Ray;
pub use geom::slab::SlabModel;
pub use geom::vector::Vector;
pub use sim::framework::SimulationContext;
pub use sim::manager::SimulationManager;
pub use sim::particle::{ParticleState, ParticleType};
pub use sim::properties::SimulationProperties;
