//! Resources manager: per-patch storage of named fields and particle arrays.
//!
//! Physical objects ([`VecField`](crate::data::vecfield::VecField),
//! [`IonPopulation`](crate::data::ion_population::IonPopulation), ...) only
//! hold names. Their buffers live here, one [`PatchData`] per patch, and are
//! lent to the object for the duration of a per-patch scope opened with
//! [`ResourcesManager::set_on_patch`]. The returned [`OnPatch`] guard gives the
//! buffers back when dropped.
//!
//! While a buffer is lent out it is absent from its `PatchData`; any other
//! attempt to take it fails with [`AmrError::ResourceOnLoan`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};

use crate::amr_error::AmrError;
use crate::data::field::Field;
use crate::debug_invariants::DebugInvariants;
use crate::data::particles::ParticleArray;
use crate::geometry::layout::{GridLayout, HybridQuantity, to_field_box};
use crate::hierarchy::patch::{Patch, PatchId};

/// Name and kind of one resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceName {
    Field {
        name: String,
        quantity: HybridQuantity,
    },
    Particles(String),
}

impl ResourceName {
    pub fn field(name: impl Into<String>, quantity: HybridQuantity) -> Self {
        ResourceName::Field {
            name: name.into(),
            quantity,
        }
    }

    pub fn particles(name: impl Into<String>) -> Self {
        ResourceName::Particles(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ResourceName::Field { name, .. } => name,
            ResourceName::Particles(name) => name,
        }
    }
}

/// Anything whose buffers are managed by a [`ResourcesManager`].
pub trait ResourcesUser {
    /// Every resource this user needs on a patch.
    fn resource_names(&self) -> Vec<ResourceName>;
    /// Take the user's buffers out of `data`. On error nothing stays attached.
    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError>;
    /// Give every attached buffer back to `data`.
    fn detach(&mut self, data: &mut PatchData);
    fn is_usable(&self) -> bool;
}

impl<T: ResourcesUser + ?Sized> ResourcesUser for &mut T {
    fn resource_names(&self) -> Vec<ResourceName> {
        (**self).resource_names()
    }
    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        (**self).attach(data)
    }
    fn detach(&mut self, data: &mut PatchData) {
        (**self).detach(data)
    }
    fn is_usable(&self) -> bool {
        (**self).is_usable()
    }
}

impl<A: ResourcesUser, B: ResourcesUser> ResourcesUser for (A, B) {
    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names = self.0.resource_names();
        names.extend(self.1.resource_names());
        names
    }
    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        attach_all(
            &mut [
                &mut self.0 as &mut dyn ResourcesUser,
                &mut self.1 as &mut dyn ResourcesUser,
            ],
            data,
        )
    }
    fn detach(&mut self, data: &mut PatchData) {
        self.0.detach(data);
        self.1.detach(data);
    }
    fn is_usable(&self) -> bool {
        self.0.is_usable() && self.1.is_usable()
    }
}

/// Attach `parts` in order; if one fails, detach the ones already attached.
pub(crate) fn attach_all(
    parts: &mut [&mut dyn ResourcesUser],
    data: &mut PatchData,
) -> Result<(), AmrError> {
    for i in 0..parts.len() {
        if let Err(e) = parts[i].attach(data) {
            for p in parts[..i].iter_mut() {
                p.detach(data);
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Buffers and timestamps of every resource allocated on one patch.
#[derive(Clone, Debug)]
pub struct PatchData {
    patch: PatchId,
    fields: BTreeMap<String, Field>,
    particles: BTreeMap<String, ParticleArray>,
    times: BTreeMap<String, f64>,
    allocated: BTreeSet<String>,
}

impl PatchData {
    fn new(patch: PatchId) -> Self {
        Self {
            patch,
            fields: BTreeMap::new(),
            particles: BTreeMap::new(),
            times: BTreeMap::new(),
            allocated: BTreeSet::new(),
        }
    }

    pub fn patch(&self) -> PatchId {
        self.patch
    }

    fn missing(&self, name: &str) -> AmrError {
        if self.allocated.contains(name) {
            AmrError::ResourceOnLoan {
                name: name.to_string(),
                patch: self.patch,
            }
        } else {
            AmrError::UnknownResource {
                name: name.to_string(),
            }
        }
    }

    pub fn field(&self, name: &str) -> Result<&Field, AmrError> {
        self.fields.get(name).ok_or_else(|| self.missing(name))
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut Field, AmrError> {
        if !self.fields.contains_key(name) {
            return Err(self.missing(name));
        }
        self.fields
            .get_mut(name)
            .ok_or_else(|| AmrError::UnknownResource {
                name: name.to_string(),
            })
    }

    pub fn particles(&self, name: &str) -> Result<&ParticleArray, AmrError> {
        self.particles.get(name).ok_or_else(|| self.missing(name))
    }

    pub fn particles_mut(&mut self, name: &str) -> Result<&mut ParticleArray, AmrError> {
        if !self.particles.contains_key(name) {
            return Err(self.missing(name));
        }
        self.particles
            .get_mut(name)
            .ok_or_else(|| AmrError::UnknownResource {
                name: name.to_string(),
            })
    }

    /// Take every named field, or none of them.
    pub fn take_fields(&mut self, names: &[String]) -> Result<Vec<Field>, AmrError> {
        if let Some(n) = names.iter().find(|n| !self.fields.contains_key(n.as_str())) {
            return Err(self.missing(n));
        }
        Ok(names
            .iter()
            .filter_map(|n| self.fields.remove(n.as_str()))
            .collect())
    }

    /// Take every named particle array, or none of them.
    pub fn take_particles(&mut self, names: &[String]) -> Result<Vec<ParticleArray>, AmrError> {
        if let Some(n) = names
            .iter()
            .find(|n| !self.particles.contains_key(n.as_str()))
        {
            return Err(self.missing(n));
        }
        Ok(names
            .iter()
            .filter_map(|n| self.particles.remove(n.as_str()))
            .collect())
    }

    pub fn put_field(&mut self, field: Field) {
        field.debug_assert_invariants();
        self.fields.insert(field.name().to_string(), field);
    }

    pub fn put_particles(&mut self, name: &str, particles: ParticleArray) {
        self.particles.insert(name.to_string(), particles);
    }

    pub fn time(&self, name: &str) -> Result<f64, AmrError> {
        self.times
            .get(name)
            .copied()
            .ok_or_else(|| AmrError::UnknownResource {
                name: name.to_string(),
            })
    }

    pub fn set_time(&mut self, name: &str, time: f64) {
        if self.allocated.contains(name) {
            self.times.insert(name.to_string(), time);
        }
    }

    pub fn is_allocated(&self, name: &str) -> bool {
        self.allocated.contains(name)
    }
}

/// Owner of every patch's resource buffers.
#[derive(Clone, Debug)]
pub struct ResourcesManager {
    interp_order: u32,
    registered: BTreeMap<String, ResourceName>,
    patches: BTreeMap<PatchId, PatchData>,
}

impl ResourcesManager {
    pub fn new(interp_order: u32) -> Result<Self, AmrError> {
        if !(1..=3).contains(&interp_order) {
            return Err(AmrError::UnsupportedInterpOrder(interp_order));
        }
        Ok(Self {
            interp_order,
            registered: BTreeMap::new(),
            patches: BTreeMap::new(),
        })
    }

    pub fn interp_order(&self) -> u32 {
        self.interp_order
    }

    /// Grid layout of `patch` at this manager's interpolation order.
    pub fn layout(&self, patch: &Patch) -> Result<GridLayout, AmrError> {
        patch.layout(self.interp_order)
    }

    /// Record every resource `user` names.
    pub fn register<U: ResourcesUser + ?Sized>(&mut self, user: &U) {
        for r in user.resource_names() {
            log::trace!("registering resource `{}`", r.name());
            self.registered.insert(r.name().to_string(), r);
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.contains_key(name)
    }

    /// Create storage on `patch` for every resource of `user`.
    ///
    /// Resources already allocated on the patch are left untouched.
    pub fn allocate<U: ResourcesUser + ?Sized>(
        &mut self,
        user: &U,
        patch: &Patch,
        time: f64,
    ) -> Result<(), AmrError> {
        let names = user.resource_names();
        if let Some(r) = names
            .iter()
            .find(|r| !self.registered.contains_key(r.name()))
        {
            return Err(AmrError::UnknownResource {
                name: r.name().to_string(),
            });
        }
        let layout = self.layout(patch)?;
        let data = self
            .patches
            .entry(patch.id())
            .or_insert_with(|| PatchData::new(patch.id()));
        for r in names {
            if data.allocated.contains(r.name()) {
                continue;
            }
            match &r {
                ResourceName::Field { name, quantity } => {
                    let ghost_box = to_field_box(patch.cell_box(), *quantity, &layout, true);
                    data.fields
                        .insert(name.clone(), Field::new(name.clone(), *quantity, ghost_box));
                }
                ResourceName::Particles(name) => {
                    data.particles.insert(name.clone(), ParticleArray::new());
                }
            }
            data.times.insert(r.name().to_string(), time);
            data.allocated.insert(r.name().to_string());
        }
        Ok(())
    }

    /// Drop every buffer stored for `patch`.
    pub fn deallocate(&mut self, patch: PatchId) {
        if self.patches.remove(&patch).is_some() {
            log::trace!("deallocated resources of patch {patch}");
        }
    }

    pub fn is_allocated<U: ResourcesUser + ?Sized>(&self, user: &U, patch: PatchId) -> bool {
        self.patches.get(&patch).is_some_and(|d| {
            user.resource_names()
                .iter()
                .all(|r| d.is_allocated(r.name()))
        })
    }

    pub fn patch_data(&self, patch: PatchId) -> Result<&PatchData, AmrError> {
        self.patches
            .get(&patch)
            .ok_or(AmrError::PatchNotAllocated { patch })
    }

    pub fn patch_data_mut(&mut self, patch: PatchId) -> Result<&mut PatchData, AmrError> {
        self.patches
            .get_mut(&patch)
            .ok_or(AmrError::PatchNotAllocated { patch })
    }

    /// Lend the buffers of `patch` to `user` until the guard is dropped.
    pub fn set_on_patch<'a, U: ResourcesUser + ?Sized>(
        &'a mut self,
        patch: PatchId,
        user: &'a mut U,
    ) -> Result<OnPatch<'a, U>, AmrError> {
        let data = self.patch_data_mut(patch)?;
        user.attach(data)?;
        Ok(OnPatch { data, user })
    }

    /// Timestamp of each resource of `user` on `patch`, in `resource_names` order.
    pub fn get_times<U: ResourcesUser + ?Sized>(
        &self,
        user: &U,
        patch: PatchId,
    ) -> Result<Vec<f64>, AmrError> {
        let data = self.patch_data(patch)?;
        user.resource_names()
            .iter()
            .map(|r| data.time(r.name()))
            .collect()
    }

    /// Stamp every resource of `user` on `patch` with `time`.
    pub fn set_times<U: ResourcesUser + ?Sized>(
        &mut self,
        user: &U,
        patch: PatchId,
        time: f64,
    ) -> Result<(), AmrError> {
        let names = user.resource_names();
        let data = self.patch_data_mut(patch)?;
        for r in &names {
            data.set_time(r.name(), time);
        }
        Ok(())
    }
}

/// Scoped loan of one patch's buffers to a resources user.
pub struct OnPatch<'a, U: ResourcesUser + ?Sized> {
    data: &'a mut PatchData,
    user: &'a mut U,
}

impl<U: ResourcesUser + ?Sized> OnPatch<'_, U> {
    pub fn patch(&self) -> PatchId {
        self.data.patch
    }
}

impl<U: ResourcesUser + ?Sized> Deref for OnPatch<'_, U> {
    type Target = U;
    fn deref(&self) -> &U {
        &*self.user
    }
}

impl<U: ResourcesUser + ?Sized> DerefMut for OnPatch<'_, U> {
    fn deref_mut(&mut self) -> &mut U {
        &mut *self.user
    }
}

impl<U: ResourcesUser + ?Sized> Drop for OnPatch<'_, U> {
    fn drop(&mut self) {
        self.user.detach(self.data);
    }
}
