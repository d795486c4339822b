use crate::error::{Error, Result};
use crate::sim::particle::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type MaterialId = u32;

/// One nuclide of a material with energy-independent cross sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialComponent {
    pub nuclide: String,
    /// Number density in atoms/(barn*cm).
    pub number_density: f64,
    /// Microscopic total cross section in barns.
    pub total_cross_section: f64,
    /// Fraction of collisions that absorb [0.0, 1.0].
    pub absorption_fraction: f64,
    /// Nuclide mass over neutron mass.
    pub atomic_weight_ratio: f64,
    /// Fraction of scatters that are (n,2n) reactions [0.0, 1.0].
    #[serde(default)]
    pub n2n_fraction: f64,
}

impl MaterialComponent {
    pub fn new(
        nuclide: &str,
        number_density: f64,
        total_cross_section: f64,
        absorption_fraction: f64,
        atomic_weight_ratio: f64,
    ) -> Self {
        Self {
            nuclide: nuclide.to_string(),
            number_density,
            total_cross_section,
            absorption_fraction,
            atomic_weight_ratio,
            n2n_fraction: 0.,
        }
    }

    pub fn with_n2n_fraction(mut self, fraction: f64) -> Self {
        self.n2n_fraction = fraction;
        self
    }

    /// Macroscopic total cross section of this nuclide in 1/cm.
    pub fn macroscopic_total_cross_section(&self) -> f64 {
        self.number_density * self.total_cross_section
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let fraction = 0.0..=1.0;
        if !(self.number_density.is_finite() && self.number_density > 0.) {
            return Err(format!("{}: number density must be positive", self.nuclide));
        }
        if !(self.total_cross_section.is_finite() && self.total_cross_section >= 0.) {
            return Err(format!("{}: cross section must be non-negative", self.nuclide));
        }
        if !fraction.contains(&self.absorption_fraction) || !fraction.contains(&self.n2n_fraction) {
            return Err(format!("{}: fractions must be in [0, 1]", self.nuclide));
        }
        if !(self.atomic_weight_ratio.is_finite() && self.atomic_weight_ratio > 0.) {
            return Err(format!("{}: atomic weight ratio must be positive", self.nuclide));
        }
        Ok(())
    }
}

/// Homogeneous mixture of nuclides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub components: Vec<MaterialComponent>,
}

impl Material {
    pub fn new(id: MaterialId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: MaterialComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Macroscopic total cross section in 1/cm.
    pub fn macroscopic_total_cross_section(&self) -> f64 {
        self.components
            .iter()
            .map(|c| c.macroscopic_total_cross_section())
            .sum()
    }

    /// Macroscopic absorption cross section in 1/cm.
    pub fn macroscopic_absorption_cross_section(&self) -> f64 {
        self.components
            .iter()
            .map(|c| c.macroscopic_total_cross_section() * c.absorption_fraction)
            .sum()
    }

    /// Macroscopic (n,2n) cross section in 1/cm.
    pub fn macroscopic_n2n_cross_section(&self) -> f64 {
        self.components
            .iter()
            .map(|c| c.macroscopic_total_cross_section() * (1. - c.absorption_fraction) * c.n2n_fraction)
            .sum()
    }

    /// Component hit by a collision, chosen with probability proportional to
    /// its macroscopic cross section. `u` is uniform in [0, 1).
    pub fn sample_component(&self, u: f64) -> Option<&MaterialComponent> {
        let total = self.macroscopic_total_cross_section();
        let target = u * total;
        let mut cumulative = 0.;
        for component in &self.components {
            cumulative += component.macroscopic_total_cross_section();
            if target < cumulative {
                return Some(component);
            }
        }
        self.components.last()
    }

    fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            return Err(Error::Config(format!(
                "material {} ({}) has no components",
                self.id, self.name
            )));
        }
        for component in &self.components {
            component.validate().map_err(|e| {
                Error::Config(format!("material {} ({}): {}", self.id, self.name, e))
            })?;
        }
        Ok(())
    }
}

/// Material definitions and their assignment to cells.
///
/// Every cell holds at most one material. Cells without a material are void.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, Material>,
    cell_materials: HashMap<EntityId, MaterialId>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material definition.
    pub fn add(&mut self, material: Material) -> Result<()> {
        material.validate()?;
        if self.materials.contains_key(&material.id) {
            return Err(Error::Config(format!(
                "material id {} is defined twice",
                material.id
            )));
        }
        self.materials.insert(material.id, material);
        Ok(())
    }

    /// Fills `cell` with material `material_id`.
    ///
    /// Repeating an identical assignment is allowed. Assigning a different
    /// material to an already filled cell is an error.
    pub fn assign(&mut self, cell: EntityId, material_id: MaterialId) -> Result<()> {
        if !self.materials.contains_key(&material_id) {
            return Err(Error::Config(format!(
                "cell {cell}: material {material_id} is not defined"
            )));
        }
        match self.cell_materials.get(&cell) {
            Some(&existing) if existing != material_id => Err(Error::Config(format!(
                "cell {cell} already contains material {existing}, cannot also assign material {material_id}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.cell_materials.insert(cell, material_id);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn material_in_cell(&self, cell: EntityId) -> Option<&Material> {
        self.cell_materials
            .get(&cell)
            .and_then(|id| self.materials.get(id))
    }

    pub fn is_cell_void(&self, cell: EntityId) -> bool {
        self.material_in_cell(cell).is_none()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Creates a library with a few common shielding materials.
    ///
    /// Ids: 1 water, 2 iron, 3 lead. Cross sections are representative
    /// fast-neutron values.
    pub fn with_presets() -> Self {
        let mut lib = Self::new();
        let presets = [
            Material::new(1, "water")
                .with_component(MaterialComponent::new("H-1", 0.066_86, 20.0, 0.0166, 0.9992))
                .with_component(MaterialComponent::new("O-16", 0.033_43, 3.8, 0.000_05, 15.858)),
            Material::new(2, "iron").with_component(
                MaterialComponent::new("Fe-56", 0.084_8, 11.6, 0.022, 55.454)
                    .with_n2n_fraction(0.01),
            ),
            Material::new(3, "lead").with_component(
                MaterialComponent::new("Pb-208", 0.033, 11.0, 0.001, 206.19)
                    .with_n2n_fraction(0.05),
            ),
        ];
        for material in presets {
            // Presets are known to be valid
            let _ = lib.add(material);
        }
        lib
    }
}
