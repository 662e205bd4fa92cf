//! Hybrid model state and the model wrapping it with its resources manager.

use crate::amr_error::AmrError;
use crate::data::electromag::Electromag;
use crate::data::ions::Ions;
use crate::hierarchy::patch::Patch;
use crate::hierarchy::resources::{
    PatchData, ResourceName, ResourcesManager, ResourcesUser, attach_all,
};
use crate::messenger::info::{HybridMessengerInfo, VecFieldDescriptor};

/// Electromagnetic field and ions of the hybrid model.
#[derive(Clone, Debug, PartialEq)]
pub struct HybridState {
    pub electromag: Electromag,
    pub ions: Ions,
}

impl HybridState {
    pub fn new(electromag: Electromag, ions: Ions) -> Self {
        Self { electromag, ions }
    }

    /// A state can be set on a patch only while it is not already set on one.
    pub fn is_settable(&self) -> bool {
        !self.electromag.is_usable() && !self.ions.is_usable()
    }
}

impl ResourcesUser for HybridState {
    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names = self.electromag.resource_names();
        names.extend(self.ions.resource_names());
        names
    }

    fn attach(&mut self, data: &mut PatchData) -> Result<(), AmrError> {
        attach_all(
            &mut [
                &mut self.electromag as &mut dyn ResourcesUser,
                &mut self.ions as &mut dyn ResourcesUser,
            ],
            data,
        )
    }

    fn detach(&mut self, data: &mut PatchData) {
        self.electromag.detach(data);
        self.ions.detach(data);
    }

    fn is_usable(&self) -> bool {
        self.electromag.is_usable() && self.ions.is_usable()
    }
}

/// The hybrid model: its state and the manager owning the state's buffers.
#[derive(Clone, Debug)]
pub struct HybridModel {
    pub state: HybridState,
    pub resources: ResourcesManager,
}

impl HybridModel {
    pub const MODEL_NAME: &'static str = "HybridModel";

    /// Wrap `state`, registering its resources with `resources`.
    pub fn new(state: HybridState, mut resources: ResourcesManager) -> Self {
        resources.register(&state);
        Self { state, resources }
    }

    pub fn name(&self) -> &'static str {
        Self::MODEL_NAME
    }

    /// Allocate every state buffer on `patch`.
    pub fn allocate(&mut self, patch: &Patch, time: f64) -> Result<(), AmrError> {
        self.resources.allocate(&self.state, patch, time)
    }

    /// Load each population's domain particles over the patch interior.
    pub fn initialize(&mut self, patch: &Patch) -> Result<(), AmrError> {
        let mut ions = self.resources.set_on_patch(patch.id(), &mut self.state.ions)?;
        for pop in ions.populations_mut() {
            pop.load_particles(patch.cell_box())?;
        }
        Ok(())
    }

    /// Declare which quantities the messenger must keep synchronized.
    pub fn fill_messenger_info(&self, info: &mut HybridMessengerInfo) {
        let b = VecFieldDescriptor::from(&self.state.electromag.b);
        let e = VecFieldDescriptor::from(&self.state.electromag.e);
        info.model_magnetic = Some(b.clone());
        info.model_electric = Some(e.clone());
        info.init_magnetic.push(b.clone());
        info.init_electric.push(e.clone());
        info.ghost_magnetic.push(b);
        info.ghost_electric.push(e);
        info.model_ion_density = Some(self.state.ions.density_name());
        info.model_ion_bulk_velocity =
            Some(VecFieldDescriptor::from(self.state.ions.bulk_velocity()));
        for pop in self.state.ions.populations() {
            let name = pop.name().to_string();
            info.interior_particles.push(name.clone());
            info.level_ghost_particles_old.push(name.clone());
            info.level_ghost_particles_new.push(name.clone());
            info.patch_ghost_particles.push(name);
        }
    }
}
