//! Three-component vector field whose buffers come from the resources manager.

use crate::amr_error::AmrError;
use crate::data::field::Field;
use crate::geometry::layout::HybridQuantity;
use crate::hierarchy::resources::{PatchData, ResourceName, ResourcesUser};

const COMPONENTS: [&str; 3] = ["x", "y", "z"];

/// A named vector of three fields, usable only while set on a patch.
#[derive(Clone, Debug, PartialEq)]
pub struct VecField {
    name: String,
    quantities: [HybridQuantity; 3],
    components: Option<[Field; 3]>,
}

impl VecField {
    pub fn new(name: impl Into<String>, quantities: [HybridQuantity; 3]) -> Self {
        Self {
            name: name.into(),
            quantities,
            components: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantities(&self) -> [HybridQuantity; 3] {
        self.quantities
    }

    /// Resource name of component `i` (`<name>_x`, `<name>_y`, `<name>_z`).
    pub fn component_name(&self, i: usize) -> String {
        format!("{}_{}", self.name, COMPONENTS[i])
    }

    pub fn component_names(&self) -> [String; 3] {
        [0, 1, 2].map(|i| self.component_name(i))
    }

    fn not_usable(&self) -> AmrError {
        AmrError::ResourceNotUsable {
            name: self.name.clone(),
        }
    }

    pub fn components(&self) -> Result<&[Field; 3], AmrError> {
        self.components.as_ref().ok_or_else(|| self.not_usable())
    }

    pub fn components_mut(&mut self) -> Result<&mut [Field; 3], AmrError> {
        match self.components.as_mut() {
            Some(c) => Ok(c),
            None => Err(AmrError::ResourceNotUsable {
                name: self.name.clone(),
            }),
        }
    }

    pub fn component(&self, i: usize) -> Result<&Field, AmrError> {
        Ok(&self.components()?[i])
    }

    pub fn component_mut(&mut self, i: usize) -> Result<&mut Field, AmrError> {
        Ok(&mut self.components_mut()?[i])
    }

    /// Copy every component of `other` into `self`.
    pub fn copy_data(&mut self, other: &VecField) -> Result<(), AmrError> {
        let src = other.components()?;
        let dst = self.components_mut()?;
        for (d, s) in dst.iter_mut().zip(src) {
            d.copy_from(s);
        }
        Ok(())
    }

    pub fn zero(&mut self) -> Result<(), AmrError> {
        for f in self.components_mut()? {
            f.fill(0.0);
        }
        Ok(())
    }
}

impl ResourcesUser for VecField {
    fn resource_names(&self) -> Vec<ResourceName> {
        (0..3)
            .map(|i| ResourceName::field(self.component_name(i), self.quantities[i]))
            .collect()
    }

    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        let fields = data.take_fields(&self.component_names())?;
        let fields: [Field; 3] = fields.try_into().map_err(|_| self.not_usable())?;
        self.components = Some(fields);
        Ok(())
    }

    fn detach(&mut self, data: &mut PatchData) {
        if let Some(fields) = self.components.take() {
            for f in fields {
                data.put_field(f);
            }
        }
    }

    fn is_usable(&self) -> bool {
        self.components.is_some()
    }
}
