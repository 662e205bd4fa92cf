//! One ion species on a patch: five particle sets plus its density and flux.
//!
//! | set               | content                                                   |
//! |-------------------|-----------------------------------------------------------|
//! | `Domain`          | particles inside the patch interior                       |
//! | `PatchGhost`      | copies of same-level neighbors' particles in ghost cells  |
//! | `LevelGhostOld`   | coarse-split border particles before the coarse push      |
//! | `LevelGhostNew`   | coarse-split border particles after the coarse push       |
//! | `LevelGhost`      | pushable copy of `LevelGhostOld`                          |

use crate::algs::interpolate::Interpolator;
use crate::amr_error::AmrError;
use crate::data::field::Field;
use crate::data::particle_initializer::{InitializerInfo, ParticleInitializerFactory};
use crate::data::particles::ParticleArray;
use crate::geometry::index_box::IndexBox;
use crate::geometry::layout::HybridQuantity;
use crate::hierarchy::resources::{PatchData, ResourceName, ResourcesUser};

/// Which of the five particle sets of a population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleSet {
    Domain,
    PatchGhost,
    LevelGhostOld,
    LevelGhostNew,
    /// Pushable level-ghost particles.
    LevelGhost,
}

impl ParticleSet {
    pub const ALL: [ParticleSet; 5] = [
        ParticleSet::Domain,
        ParticleSet::PatchGhost,
        ParticleSet::LevelGhostOld,
        ParticleSet::LevelGhostNew,
        ParticleSet::LevelGhost,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ParticleSet::Domain => "domain",
            ParticleSet::PatchGhost => "patchGhost",
            ParticleSet::LevelGhostOld => "levelGhostOld",
            ParticleSet::LevelGhostNew => "levelGhostNew",
            ParticleSet::LevelGhost => "levelGhost",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
struct PopulationBuffers {
    particles: [ParticleArray; 5],
    density: Field,
    flux: [Field; 3],
}

/// A named ion species with its mass and initializer description.
#[derive(Clone, Debug, PartialEq)]
pub struct IonPopulation {
    name: String,
    mass: f64,
    initializer: InitializerInfo,
    buffers: Option<PopulationBuffers>,
}

impl IonPopulation {
    /// Population `<ions_name>_<species>`.
    pub fn new(ions_name: &str, species: &str, mass: f64, initializer: InitializerInfo) -> Self {
        Self {
            name: format!("{ions_name}_{species}"),
            mass,
            initializer,
            buffers: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn initializer_info(&self) -> &InitializerInfo {
        &self.initializer
    }

    pub fn particle_name(&self, set: ParticleSet) -> String {
        format!("{}_{}", self.name, set.suffix())
    }

    pub fn density_name(&self) -> String {
        format!("{}_rho", self.name)
    }

    pub fn flux_name(&self, i: usize) -> String {
        format!("{}_flux_{}", self.name, ["x", "y", "z"][i])
    }

    pub fn particle_array_names(&self) -> Vec<String> {
        ParticleSet::ALL
            .iter()
            .map(|&s| self.particle_name(s))
            .collect()
    }

    /// Density first, then the three flux components.
    pub fn field_names_and_quantities(&self) -> Vec<(String, HybridQuantity)> {
        let mut out = vec![(self.density_name(), HybridQuantity::Rho)];
        out.extend(
            HybridQuantity::flux()
                .into_iter()
                .enumerate()
                .map(|(i, q)| (self.flux_name(i), q)),
        );
        out
    }

    fn buffers(&self) -> Result<&PopulationBuffers, AmrError> {
        self.buffers
            .as_ref()
            .ok_or_else(|| AmrError::ResourceNotUsable {
                name: self.name.clone(),
            })
    }

    fn buffers_mut(&mut self) -> Result<&mut PopulationBuffers, AmrError> {
        match self.buffers.as_mut() {
            Some(b) => Ok(b),
            None => Err(AmrError::ResourceNotUsable {
                name: self.name.clone(),
            }),
        }
    }

    pub fn particles(&self, set: ParticleSet) -> Result<&ParticleArray, AmrError> {
        Ok(&self.buffers()?.particles[set.slot()])
    }

    pub fn particles_mut(&mut self, set: ParticleSet) -> Result<&mut ParticleArray, AmrError> {
        Ok(&mut self.buffers_mut()?.particles[set.slot()])
    }

    pub fn density(&self) -> Result<&Field, AmrError> {
        Ok(&self.buffers()?.density)
    }

    pub fn flux(&self) -> Result<&[Field; 3], AmrError> {
        Ok(&self.buffers()?.flux)
    }

    /// Replace `to` with a copy of `from`.
    pub fn replicate(&mut self, from: ParticleSet, to: ParticleSet) -> Result<(), AmrError> {
        let b = self.buffers_mut()?;
        let copy = b.particles[from.slot()].clone();
        b.particles[to.slot()] = copy;
        Ok(())
    }

    /// Move `from` into `to`, leaving `from` empty.
    pub fn rotate(&mut self, from: ParticleSet, to: ParticleSet) -> Result<(), AmrError> {
        let b = self.buffers_mut()?;
        b.particles[to.slot()] = std::mem::take(&mut b.particles[from.slot()]);
        Ok(())
    }

    /// Zero density and flux.
    pub fn reset_moments(&mut self) -> Result<(), AmrError> {
        let b = self.buffers_mut()?;
        b.density.fill(0.0);
        b.flux.iter_mut().for_each(|f| f.fill(0.0));
        Ok(())
    }

    /// Deposit one particle set onto density and flux with the given weight.
    pub fn deposit(
        &mut self,
        set: ParticleSet,
        interpolator: &Interpolator,
        weight: f64,
    ) -> Result<(), AmrError> {
        let b = self.buffers_mut()?;
        let PopulationBuffers {
            particles,
            density,
            flux,
        } = b;
        interpolator.interpolate(&particles[set.slot()], density, flux, weight);
        Ok(())
    }

    /// Load the domain set over `cells` with this population's initializer.
    pub fn load_particles(&mut self, cells: &IndexBox) -> Result<(), AmrError> {
        let init = ParticleInitializerFactory::create(&self.initializer)?;
        let domain = self.particles_mut(ParticleSet::Domain)?;
        init.load_particles(domain, cells);
        Ok(())
    }
}

impl ResourcesUser for IonPopulation {
    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names: Vec<ResourceName> = self
            .particle_array_names()
            .into_iter()
            .map(ResourceName::Particles)
            .collect();
        names.extend(
            self.field_names_and_quantities()
                .into_iter()
                .map(|(n, q)| ResourceName::field(n, q)),
        );
        names
    }

    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        let field_names: Vec<String> = self
            .field_names_and_quantities()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        let particle_names = self.particle_array_names();
        let mut fields = data.take_fields(&field_names)?;
        let particles = match data.take_particles(&particle_names) {
            Ok(p) => p,
            Err(e) => {
                for f in fields {
                    data.put_field(f);
                }
                return Err(e);
            }
        };
        let flux: Vec<Field> = fields.split_off(1);
        let (Ok(particles), Ok(flux), Some(density)) = (
            <[ParticleArray; 5]>::try_from(particles),
            <[Field; 3]>::try_from(flux),
            fields.pop(),
        ) else {
            return Err(AmrError::ResourceNotUsable {
                name: self.name.clone(),
            });
        };
        self.buffers = Some(PopulationBuffers {
            particles,
            density,
            flux,
        });
        Ok(())
    }

    fn detach(&mut self, data: &mut PatchData) {
        if let Some(b) = self.buffers.take() {
            let names = self.particle_array_names();
            for (name, arr) in names.iter().zip(b.particles) {
                data.put_particles(name, arr);
            }
            data.put_field(b.density);
            for f in b.flux {
                data.put_field(f);
            }
        }
    }

    fn is_usable(&self) -> bool {
        self.buffers.is_some()
    }
}
