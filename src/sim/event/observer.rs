use crate::sim::particle::{EntityId, ParticleState};

/// Observes particles being generated (sourced) in a cell.
pub trait ParticleGenerationObserver: Send + Sync {
    fn update_from_particle_generation_event(&self, particle: &ParticleState, cell: EntityId);
}

/// Observes particles crossing a surface.
pub trait ParticleCrossingSurfaceObserver: Send + Sync {
    /// `angle_cosine` is the cosine between the direction and the surface normal.
    fn update_from_particle_crossing_surface_event(
        &self,
        particle: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    );
}

pub trait ParticleEnteringCellObserver: Send + Sync {
    fn update_from_particle_entering_cell_event(&self, particle: &ParticleState, cell: EntityId);
}

pub trait ParticleLeavingCellObserver: Send + Sync {
    fn update_from_particle_leaving_cell_event(&self, particle: &ParticleState, cell: EntityId);
}

/// Observes the end of a straight sub-track inside a cell.
pub trait ParticleSubtrackEndingInCellObserver: Send + Sync {
    fn update_from_particle_subtrack_ending_in_cell_event(
        &self,
        particle: &ParticleState,
        cell: EntityId,
        track_length: f64,
    );
}

/// Observes collisions inside a cell.
pub trait ParticleCollidingInCellObserver: Send + Sync {
    /// `inverse_total_cross_section` is the local mean free path.
    fn update_from_particle_colliding_in_cell_event(
        &self,
        particle: &ParticleState,
        cell: EntityId,
        inverse_total_cross_section: f64,
    );
}
