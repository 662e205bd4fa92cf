//! Electromagnetic state: electric and magnetic vector fields.

use crate::amr_error::AmrError;
use crate::data::vecfield::VecField;
use crate::geometry::layout::HybridQuantity;
use crate::hierarchy::resources::{PatchData, ResourceName, ResourcesUser, attach_all};

#[derive(Clone, Debug, PartialEq)]
pub struct Electromag {
    name: String,
    pub e: VecField,
    pub b: VecField,
}

impl Electromag {
    /// `name_E` and `name_B` vector fields on the Yee lattice.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            e: VecField::new(format!("{name}_E"), HybridQuantity::electric()),
            b: VecField::new(format!("{name}_B"), HybridQuantity::magnetic()),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy both fields of `source` into `self`.
    pub fn copy_data(&mut self, source: &Electromag) -> Result<(), AmrError> {
        self.e.copy_data(&source.e)?;
        self.b.copy_data(&source.b)
    }
}

impl ResourcesUser for Electromag {
    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names = self.e.resource_names();
        names.extend(self.b.resource_names());
        names
    }

    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        attach_all(
            &mut [
                &mut self.e as &mut dyn ResourcesUser,
                &mut self.b as &mut dyn ResourcesUser,
            ],
            data,
        )
    }

    fn detach(&mut self, data: &mut PatchData) {
        self.e.detach(data);
        self.b.detach(data);
    }

    fn is_usable(&self) -> bool {
        self.e.is_usable() && self.b.is_usable()
    }
}
