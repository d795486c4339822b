use crate::error::{Error, Result};
use crate::sim::particle::ParticleState;
use std::fmt;

/// Phase-space dimension along which estimator bins are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseSpaceDimension {
    Energy,
    Time,
    CollisionNumber,
    Cosine,
}

impl fmt::Display for PhaseSpaceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Energy => "Energy",
            Self::Time => "Time",
            Self::CollisionNumber => "Collision Number",
            Self::Cosine => "Cosine",
        };
        write!(f, "{name}")
    }
}

/// Values of every dimension for one contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionValues {
    pub energy: f64,
    pub time: f64,
    pub collision_number: f64,
    /// Only surface events carry an angle cosine.
    pub cosine: Option<f64>,
}

impl DimensionValues {
    pub fn from_particle(particle: &ParticleState) -> Self {
        Self {
            energy: particle.energy(),
            time: particle.time(),
            collision_number: particle.collision_number() as f64,
            cosine: None,
        }
    }

    pub fn with_cosine(mut self, cosine: f64) -> Self {
        self.cosine = Some(cosine);
        self
    }

    pub fn value(&self, dimension: PhaseSpaceDimension) -> Option<f64> {
        match dimension {
            PhaseSpaceDimension::Energy => Some(self.energy),
            PhaseSpaceDimension::Time => Some(self.time),
            PhaseSpaceDimension::CollisionNumber => Some(self.collision_number),
            PhaseSpaceDimension::Cosine => self.cosine,
        }
    }
}

/// Ordered bin boundaries of one dimension.
///
/// Bins are closed-open `[b_i, b_i+1)` except the last one, which is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct BinBoundaries {
    boundaries: Vec<f64>,
}

impl BinBoundaries {
    pub fn new(boundaries: Vec<f64>) -> Result<Self> {
        if boundaries.len() < 2 {
            return Err(Error::InvalidParam(
                "at least two bin boundaries are required".to_string(),
            ));
        }
        if boundaries.iter().any(|b| !b.is_finite()) {
            return Err(Error::InvalidParam("bin boundaries must be finite".to_string()));
        }
        if boundaries.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidParam(
                "bin boundaries must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { boundaries })
    }

    pub fn number_of_bins(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn lower(&self, bin: usize) -> f64 {
        self.boundaries[bin]
    }

    pub fn upper(&self, bin: usize) -> f64 {
        self.boundaries[bin + 1]
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.boundaries[0] && value <= self.boundaries[self.boundaries.len() - 1]
    }

    /// Bin containing `value`, or `None` if it is outside every bin.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !self.contains(value) {
            return None;
        }
        // Index of the first boundary strictly greater than value
        let upper = self.boundaries.partition_point(|&b| b <= value);
        Some(upper.saturating_sub(1).min(self.number_of_bins() - 1))
    }

    /// Label of a bin: `[lo, hi)` or `[lo, hi]` for the last one.
    pub fn bin_label(&self, bin: usize) -> String {
        let close = if bin + 1 == self.number_of_bins() { ']' } else { ')' };
        format!("[{:e}, {:e}{}", self.lower(bin), self.upper(bin), close)
    }
}

/// Multi-dimensional bin structure of an estimator.
///
/// The first assigned dimension varies fastest in the flattened bin index.
/// With no dimension assigned there is a single bin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseSpaceDiscretization {
    dimensions: Vec<(PhaseSpaceDimension, BinBoundaries)>,
}

impl PhaseSpaceDiscretization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the bins of one dimension.
    pub fn set_dimension(&mut self, dimension: PhaseSpaceDimension, boundaries: BinBoundaries) {
        match self.dimensions.iter_mut().find(|(d, _)| *d == dimension) {
            Some(entry) => entry.1 = boundaries,
            None => self.dimensions.push((dimension, boundaries)),
        }
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &(PhaseSpaceDimension, BinBoundaries)> {
        self.dimensions.iter()
    }

    pub fn boundaries(&self, dimension: PhaseSpaceDimension) -> Option<&BinBoundaries> {
        self.dimensions
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, b)| b)
    }

    pub fn number_of_bins(&self) -> usize {
        self.dimensions
            .iter()
            .map(|(_, b)| b.number_of_bins())
            .product()
    }

    /// Flattened bin index of `values`, or `None` if outside the phase space.
    pub fn calculate_bin_index(&self, values: &DimensionValues) -> Option<usize> {
        let mut index = 0;
        let mut stride = 1;
        for (dimension, boundaries) in &self.dimensions {
            let value = values.value(*dimension)?;
            index += boundaries.bin_index(value)? * stride;
            stride *= boundaries.number_of_bins();
        }
        Some(index)
    }

    /// Bin index from a value of a single dimension (all others must be unbinned).
    pub fn calculate_bin_index_for(&self, dimension: PhaseSpaceDimension, value: f64) -> Option<usize> {
        let mut index = 0;
        let mut stride = 1;
        for (d, boundaries) in &self.dimensions {
            if *d == dimension {
                index += boundaries.bin_index(value)? * stride;
            } else if boundaries.number_of_bins() != 1 {
                return None;
            }
            stride *= boundaries.number_of_bins();
        }
        Some(index)
    }

    /// Human-readable label of a flattened bin index.
    pub fn bin_label(&self, bin: usize) -> String {
        let mut remainder = bin;
        let mut parts = Vec::new();
        for (dimension, boundaries) in &self.dimensions {
            let n = boundaries.number_of_bins();
            parts.push(format!("{} Bin: {}", dimension, boundaries.bin_label(remainder % n)));
            remainder /= n;
        }
        parts.join(", ")
    }
}
