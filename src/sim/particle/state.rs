use crate::geom::ray::Ray;
use crate::sim::particle::EntityId;
use crate::{Point, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speed of light in cm/s.
pub const SPEED_OF_LIGHT: f64 = 29_979_245_800.0;
/// Neutron rest mass energy in MeV.
pub const NEUTRON_REST_MASS_ENERGY: f64 = 939.565_420_52;
/// Electron rest mass energy in MeV.
pub const ELECTRON_REST_MASS_ENERGY: f64 = 0.510_998_95;

/// Monotonic identifier of a source sample.
pub type HistoryNumber = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParticleType {
    Photon,
    Neutron,
    Electron,
    AdjointPhoton,
    AdjointNeutron,
    AdjointElectron,
}

impl ParticleType {
    pub const ALL: [ParticleType; 6] = [
        ParticleType::Photon,
        ParticleType::Neutron,
        ParticleType::Electron,
        ParticleType::AdjointPhoton,
        ParticleType::AdjointNeutron,
        ParticleType::AdjointElectron,
    ];

    pub fn is_adjoint(&self) -> bool {
        matches!(
            self,
            Self::AdjointPhoton | Self::AdjointNeutron | Self::AdjointElectron
        )
    }

    pub fn is_charged(&self) -> bool {
        matches!(self, Self::Electron | Self::AdjointElectron)
    }

    /// The forward counterpart of an adjoint type (forward types map to themselves).
    pub fn forward(&self) -> Self {
        match self {
            Self::AdjointPhoton => Self::Photon,
            Self::AdjointNeutron => Self::Neutron,
            Self::AdjointElectron => Self::Electron,
            other => *other,
        }
    }

    /// Rest mass energy in MeV (zero for photons).
    pub fn rest_mass_energy(&self) -> f64 {
        match self.forward() {
            Self::Neutron => NEUTRON_REST_MASS_ENERGY,
            Self::Electron => ELECTRON_REST_MASS_ENERGY,
            _ => 0.,
        }
    }

    /// Speed in cm/s of a particle of this type with kinetic energy `energy` (MeV).
    pub fn speed(&self, energy: f64) -> f64 {
        let rest = self.rest_mass_energy();
        if rest == 0. {
            return SPEED_OF_LIGHT;
        }
        let gamma_inv = rest / (energy + rest);
        SPEED_OF_LIGHT * (1. - gamma_inv * gamma_inv).max(0.).sqrt()
    }
}

impl fmt::Display for ParticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Photon => "Photon",
            Self::Neutron => "Neutron",
            Self::Electron => "Electron",
            Self::AdjointPhoton => "Adjoint Photon",
            Self::AdjointNeutron => "Adjoint Neutron",
            Self::AdjointElectron => "Adjoint Electron",
        };
        write!(f, "{name}")
    }
}

/// Kinematic and bookkeeping state of one particle.
///
/// `lost` and `gone` are mutually exclusive terminal flags. A particle with
/// either flag set must not be advanced again.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    history_number: HistoryNumber,
    particle_type: ParticleType,
    position: Point,
    direction: Vector,
    /// Kinetic energy (MeV)
    energy: f64,
    /// Elapsed time (s)
    time: f64,
    collision_number: u32,
    generation_number: u32,
    weight: f64,
    cell: EntityId,
    lost: bool,
    gone: bool,
}

impl ParticleState {
    /// Creates a unit-weight particle at the origin travelling along +z.
    pub fn new(history_number: HistoryNumber, particle_type: ParticleType) -> Self {
        Self {
            history_number,
            particle_type,
            position: Point::new(0., 0., 0.),
            direction: Vector::new(0., 0., 1.),
            energy: 1.,
            time: 0.,
            collision_number: 0,
            generation_number: 0,
            weight: 1.,
            cell: 0,
            lost: false,
            gone: false,
        }
    }

    /// Creates a secondary born from this particle.
    ///
    /// Kinematics, weight, history and cell are copied. The terminal flags
    /// never are.
    pub fn spawn_secondary(
        &self,
        particle_type: ParticleType,
        increment_generation: bool,
        reset_collision_number: bool,
    ) -> Self {
        let mut secondary = self.clone();
        secondary.particle_type = particle_type;
        if increment_generation {
            secondary.generation_number += 1;
        }
        if reset_collision_number {
            secondary.collision_number = 0;
        }
        secondary.lost = false;
        secondary.gone = false;
        secondary
    }

    pub fn history_number(&self) -> HistoryNumber {
        self.history_number
    }

    pub fn particle_type(&self) -> ParticleType {
        self.particle_type
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        debug_assert!(position.is_finite());
        self.position = position;
    }

    pub fn direction(&self) -> Vector {
        self.direction
    }

    /// Sets the direction of flight. The direction must be a unit vector.
    pub fn set_direction(&mut self, direction: Vector) {
        debug_assert!(direction.is_unit(), "direction must be a unit vector");
        self.direction = direction;
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn set_energy(&mut self, energy: f64) {
        debug_assert!(energy.is_finite() && energy >= 0.);
        self.energy = energy;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        debug_assert!(time.is_finite());
        self.time = time;
    }

    pub fn speed(&self) -> f64 {
        self.particle_type.speed(self.energy)
    }

    pub fn collision_number(&self) -> u32 {
        self.collision_number
    }

    pub fn increment_collision_number(&mut self) {
        self.collision_number += 1;
    }

    pub fn generation_number(&self) -> u32 {
        self.generation_number
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        debug_assert!(weight.is_finite() && weight > 0., "weight must be positive");
        self.weight = weight;
    }

    /// Multiplies the weight by `factor`.
    pub fn multiply_weight(&mut self, factor: f64) {
        self.set_weight(self.weight * factor);
    }

    pub fn cell(&self) -> EntityId {
        self.cell
    }

    pub fn set_cell(&mut self, cell: EntityId) {
        self.cell = cell;
    }

    /// The ray starting at the current position along the current direction.
    pub fn ray(&self) -> Ray {
        Ray::from_unit(self.position, self.direction)
    }

    /// Moves the particle `distance` along its direction and advances its clock.
    pub fn advance(&mut self, distance: f64) {
        debug_assert!(self.is_active(), "terminated particles cannot move");
        debug_assert!(distance.is_finite() && distance >= 0.);
        self.position = self.position + self.direction * distance;
        // A massive particle at rest has no time of flight
        let speed = self.speed();
        if speed > 0. {
            self.time += distance / speed;
        }
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn set_as_lost(&mut self) {
        debug_assert!(!self.gone, "a gone particle cannot become lost");
        self.lost = true;
    }

    pub fn is_gone(&self) -> bool {
        self.gone
    }

    pub fn set_as_gone(&mut self) {
        debug_assert!(!self.lost, "a lost particle cannot become gone");
        self.gone = true;
    }

    /// True while neither terminal flag is set.
    pub fn is_active(&self) -> bool {
        !self.lost && !self.gone
    }
}
