//! Declarations exchanged between a model and its messenger.
//!
//! A model lists, by name, which of its quantities need which kind of
//! synchronization; the messenger turns each list into transfer descriptors
//! of the matching communicator.

use crate::data::vecfield::VecField;
use crate::geometry::layout::HybridQuantity;

/// Names and quantities of the three components of a vector field.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VecFieldDescriptor {
    pub name: String,
    pub component_names: [String; 3],
    pub quantities: [HybridQuantity; 3],
}

impl VecFieldDescriptor {
    pub fn components(&self) -> impl Iterator<Item = (&str, HybridQuantity)> + '_ {
        self.component_names
            .iter()
            .map(String::as_str)
            .zip(self.quantities)
    }
}

impl From<&VecField> for VecFieldDescriptor {
    fn from(v: &VecField) -> Self {
        Self {
            name: v.name().to_string(),
            component_names: v.component_names(),
            quantities: v.quantities(),
        }
    }
}

/// Quantities a hybrid model wants a hybrid messenger to synchronize.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HybridMessengerInfo {
    pub model_magnetic: Option<VecFieldDescriptor>,
    pub model_electric: Option<VecFieldDescriptor>,
    pub model_ion_density: Option<String>,
    pub model_ion_bulk_velocity: Option<VecFieldDescriptor>,

    /// Fields initialized from the next coarser level on new levels.
    pub init_magnetic: Vec<VecFieldDescriptor>,
    pub init_electric: Vec<VecFieldDescriptor>,

    /// Fields whose ghosts are filled from neighbors and, at level borders,
    /// from the time-interpolated coarser level.
    pub ghost_magnetic: Vec<VecFieldDescriptor>,
    pub ghost_electric: Vec<VecFieldDescriptor>,

    /// Population names, per particle communication role.
    pub interior_particles: Vec<String>,
    pub level_ghost_particles_old: Vec<String>,
    pub level_ghost_particles_new: Vec<String>,
    pub patch_ghost_particles: Vec<String>,
}

impl HybridMessengerInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
