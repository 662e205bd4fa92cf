//! All ion populations plus the total density and bulk velocity.

use crate::amr_error::AmrError;
use crate::data::field::Field;
use crate::data::ion_population::IonPopulation;
use crate::data::vecfield::VecField;
use crate::geometry::layout::HybridQuantity;
use crate::hierarchy::resources::{PatchData, ResourceName, ResourcesUser, attach_all};

#[derive(Clone, Debug, PartialEq)]
pub struct Ions {
    name: String,
    populations: Vec<IonPopulation>,
    rho: Option<Field>,
    bulk_velocity: VecField,
}

impl Ions {
    pub fn new(name: impl Into<String>, populations: Vec<IonPopulation>) -> Self {
        let name = name.into();
        Self {
            bulk_velocity: VecField::new(
                format!("{name}_bulkVel"),
                HybridQuantity::bulk_velocity(),
            ),
            rho: None,
            populations,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn density_name(&self) -> String {
        format!("{}_rho", self.name)
    }

    pub fn populations(&self) -> &[IonPopulation] {
        &self.populations
    }

    pub fn populations_mut(&mut self) -> &mut [IonPopulation] {
        &mut self.populations
    }

    pub fn density(&self) -> Result<&Field, AmrError> {
        self.rho.as_ref().ok_or_else(|| AmrError::ResourceNotUsable {
            name: self.density_name(),
        })
    }

    pub fn bulk_velocity(&self) -> &VecField {
        &self.bulk_velocity
    }

    /// Total density: sum of every population's density.
    pub fn compute_density(&mut self) -> Result<(), AmrError> {
        let Some(rho) = self.rho.as_mut() else {
            return Err(AmrError::ResourceNotUsable {
                name: format!("{}_rho", self.name),
            });
        };
        rho.fill(0.0);
        for pop in &self.populations {
            for (p, v) in pop.density()?.iter() {
                rho.add(&p, v);
            }
        }
        Ok(())
    }

    /// Mass-weighted bulk velocity `Σ m F / Σ m ρ`, zero where the mass density vanishes.
    pub fn compute_bulk_velocity(&mut self) -> Result<(), AmrError> {
        let components = self.bulk_velocity.components_mut()?;
        let Some(rho) = self.rho.as_ref() else {
            return Err(AmrError::ResourceNotUsable {
                name: format!("{}_rho", self.name),
            });
        };
        let mut mass_density = Field::new("mass_density", HybridQuantity::Rho, *rho.index_box());
        for pop in &self.populations {
            let m = pop.mass();
            for (p, v) in pop.density()?.iter() {
                mass_density.add(&p, m * v);
            }
        }
        for (c, component) in components.iter_mut().enumerate() {
            component.fill(0.0);
            for pop in &self.populations {
                let m = pop.mass();
                for (p, f) in pop.flux()?[c].iter() {
                    component.add(&p, m * f);
                }
            }
            for (p, md) in mass_density.iter() {
                match component.get(&p) {
                    Some(num) if md > 0.0 => component.set(&p, num / md),
                    _ => component.set(&p, 0.0),
                }
            }
        }
        Ok(())
    }
}

impl ResourcesUser for Ions {
    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names = vec![ResourceName::field(self.density_name(), HybridQuantity::Rho)];
        names.extend(self.bulk_velocity.resource_names());
        for pop in &self.populations {
            names.extend(pop.resource_names());
        }
        names
    }

    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        let mut rho = data.take_fields(&[self.density_name()])?;
        let mut parts: Vec<&mut dyn ResourcesUser> = Vec::with_capacity(1 + self.populations.len());
        parts.push(&mut self.bulk_velocity);
        for pop in self.populations.iter_mut() {
            parts.push(pop);
        }
        if let Err(e) = attach_all(&mut parts, data) {
            if let Some(f) = rho.pop() {
                data.put_field(f);
            }
            return Err(e);
        }
        self.rho = rho.pop();
        Ok(())
    }

    fn detach(&mut self, data: &mut PatchData) {
        if let Some(rho) = self.rho.take() {
            data.put_field(rho);
        }
        self.bulk_velocity.detach(data);
        for pop in self.populations.iter_mut() {
            pop.detach(data);
        }
    }

    fn is_usable(&self) -> bool {
        self.rho.is_some()
            && self.bulk_velocity.is_usable()
            && self.populations.iter().all(IonPopulation::is_usable)
    }
}
