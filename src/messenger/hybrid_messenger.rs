//! Hybrid-to-hybrid messenger: drives every communicator of a hybrid model
//! through the level life-cycle.
//!
//! Levels move through `register_level`, then `init_level` (or `regrid`, or
//! `fill_root_ghosts` on the root level), then any number of sub-cycles:
//!
//! ```text
//! prepare_step → first_step → fill_*_ghosts … → last_step → sync_*
//! ```
//!
//! All operations are synchronous. Operations reading coarser state must be
//! called coarse to fine; `sync_*` fine to coarse. The messenger does not
//! check that order.

use std::collections::BTreeMap;

use crate::algs::coarsen::{coarsen_value, covered_coarse_cells};
use crate::algs::communicator::{
    CommunicationRole, Communicator, RefineOperator, TransferDescriptor,
};
use crate::algs::interpolate::Interpolator;
use crate::algs::split::{SplitPattern, SplitRole};
use crate::amr_error::AmrError;
use crate::config::AmrConfig;
use crate::data::electromag::Electromag;
use crate::data::hybrid_state::HybridModel;
use crate::data::ion_population::ParticleSet;
use crate::data::ions::Ions;
use crate::data::vecfield::VecField;
use crate::geometry::index_box::IntVect;
use crate::geometry::layout::{GridLayout, HybridQuantity, to_field_box};
use crate::hierarchy::hierarchy::PatchHierarchy;
use crate::hierarchy::patch::{Patch, PatchLevel};
use crate::hierarchy::resources::ResourcesManager;
use crate::messenger::info::{HybridMessengerInfo, VecFieldDescriptor};

/// Registration progress of the messenger as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MessengerState {
    Unregistered,
    LevelsRegistered,
    Steady,
}

/// Where a level is within its sub-cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StepPhase {
    /// Ready for a sub-cycle; the old electromagnetic snapshot may be taken.
    PreStep,
    /// Level-border particles from the advanced coarser level are in place.
    FirstStep,
    /// Ghosts are being filled during the level's own advance.
    Advancing,
    /// Border particles have been rotated for the next sub-cycle.
    LastStep,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct LevelState {
    phase: StepPhase,
    before_push_coarse_time: f64,
    /// `None` on the root level, which has no coarser level to wait for.
    after_push_coarse_time: Option<f64>,
}

impl Default for LevelState {
    fn default() -> Self {
        Self {
            phase: StepPhase::PreStep,
            before_push_coarse_time: 0.0,
            after_push_coarse_time: None,
        }
    }
}

/// Messenger between two levels both running the hybrid model.
#[derive(Clone, Debug)]
pub struct HybridMessenger {
    name: String,
    split: SplitPattern,
    interpolator: Interpolator,
    em_old: Electromag,
    ghost_fields: Communicator,
    init_fields: Communicator,
    interior_particles: Communicator,
    level_border_old: Communicator,
    level_border_new: Communicator,
    patch_ghost_particles: Communicator,
    quantities_registered: bool,
    state: MessengerState,
    levels: BTreeMap<usize, LevelState>,
}

impl HybridMessenger {
    pub const ROOT_LEVEL: usize = 0;

    /// Build a messenger and register its old electromagnetic snapshot with `resources`.
    pub fn new(config: &AmrConfig, resources: &mut ResourcesManager) -> Result<Self, AmrError> {
        config.validate()?;
        let split = config.split()?;
        let order = config.interp_order;
        let gp = config.particle_ghost_width;
        let communicator = |role| Communicator::new(role, split, order, gp);
        let em_old = Electromag::new(format!("{}_EM_old", config.strategy_name));
        resources.register(&em_old);
        Ok(Self {
            name: config.strategy_name.clone(),
            split,
            interpolator: Interpolator::new(order)?,
            em_old,
            ghost_fields: communicator(CommunicationRole::GhostField),
            init_fields: communicator(CommunicationRole::InitField),
            interior_particles: communicator(CommunicationRole::InitInteriorParticles),
            level_border_old: communicator(CommunicationRole::LevelBorderParticlesOld),
            level_border_new: communicator(CommunicationRole::LevelBorderParticlesNew),
            patch_ghost_particles: communicator(CommunicationRole::InteriorGhostParticles),
            quantities_registered: false,
            state: MessengerState::Unregistered,
            levels: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fine_model_name(&self) -> &'static str {
        HybridModel::MODEL_NAME
    }

    pub fn coarse_model_name(&self) -> &'static str {
        HybridModel::MODEL_NAME
    }

    pub fn empty_info_from_coarser(&self) -> HybridMessengerInfo {
        HybridMessengerInfo::default()
    }

    pub fn empty_info_from_finer(&self) -> HybridMessengerInfo {
        HybridMessengerInfo::default()
    }

    /// Fine particles produced per split coarse particle.
    pub fn nbr_refined_part(&self) -> usize {
        self.split.nbr_refined_part()
    }

    /// Electromagnetic field snapshot taken by [`prepare_step`](Self::prepare_step).
    pub fn em_old(&self) -> &Electromag {
        &self.em_old
    }

    pub fn state(&self) -> MessengerState {
        self.state
    }

    pub fn phase(&self, level: usize) -> Option<StepPhase> {
        self.levels.get(&level).map(|s| s.phase)
    }

    pub fn communicator(&self, role: CommunicationRole) -> &Communicator {
        match role {
            CommunicationRole::GhostField => &self.ghost_fields,
            CommunicationRole::InitField => &self.init_fields,
            CommunicationRole::InitInteriorParticles => &self.interior_particles,
            CommunicationRole::LevelBorderParticlesOld => &self.level_border_old,
            CommunicationRole::LevelBorderParticlesNew => &self.level_border_new,
            CommunicationRole::InteriorGhostParticles => &self.patch_ghost_particles,
        }
    }

    fn level_state(&self, level: usize) -> Result<&LevelState, AmrError> {
        self.levels
            .get(&level)
            .ok_or(AmrError::LevelNotRegistered { level })
    }

    fn level_state_mut(&mut self, level: usize) -> Result<&mut LevelState, AmrError> {
        self.levels
            .get_mut(&level)
            .ok_or(AmrError::LevelNotRegistered { level })
    }

    fn advance_phase(&mut self, level: usize) -> Result<(), AmrError> {
        let s = self.level_state_mut(level)?;
        if s.phase == StepPhase::FirstStep {
            s.phase = StepPhase::Advancing;
        }
        Ok(())
    }

    /// Allocate the old electromagnetic snapshot on `patch`. Idempotent.
    pub fn allocate(
        &self,
        patch: &Patch,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        resources.allocate(&self.em_old, patch, time)
    }

    /// Turn the model's declarations into transfer descriptors of the six
    /// communicators. The finer-level declarations are not used by a
    /// hybrid-to-hybrid messenger.
    pub fn register_quantities(
        &mut self,
        from_coarser: &HybridMessengerInfo,
        _from_finer: &HybridMessengerInfo,
    ) -> Result<(), AmrError> {
        self.register_space_time(from_coarser)?;
        self.register_space(from_coarser)?;
        self.quantities_registered = true;
        log::debug!("{}: quantities registered", self.name);
        Ok(())
    }

    fn register_space_time(&mut self, info: &HybridMessengerInfo) -> Result<(), AmrError> {
        let old_b = VecFieldDescriptor::from(&self.em_old.b);
        let old_e = VecFieldDescriptor::from(&self.em_old.e);
        for (ghosts, model, old, key) in [
            (&info.ghost_magnetic, &info.model_magnetic, old_b, "model_magnetic"),
            (&info.ghost_electric, &info.model_electric, old_e, "model_electric"),
        ] {
            if ghosts.is_empty() {
                continue;
            }
            let model = model
                .as_ref()
                .ok_or_else(|| AmrError::MissingKey(key.to_string()))?;
            for ghost in ghosts {
                let descriptors = ghost
                    .components()
                    .zip(model.components())
                    .zip(old.components())
                    .map(|(((dst, q), (src, _)), (old_src, _))| {
                        TransferDescriptor::field(
                            dst,
                            src,
                            Some(old_src.to_string()),
                            q,
                            RefineOperator::TimeInterpolatedRefine,
                        )
                    })
                    .collect();
                self.ghost_fields.add(ghost.name.clone(), descriptors)?;
            }
        }
        Ok(())
    }

    fn register_space(&mut self, info: &HybridMessengerInfo) -> Result<(), AmrError> {
        for vec in info.init_magnetic.iter().chain(&info.init_electric) {
            let descriptors = vec
                .components()
                .map(|(name, q)| {
                    TransferDescriptor::field(name, name, None, q, RefineOperator::FieldRefine)
                })
                .collect();
            self.init_fields.add(vec.name.clone(), descriptors)?;
        }

        let particle_name = |pop: &str, set: ParticleSet| format!("{pop}_{}", set.suffix());
        let roles: [(&Vec<String>, &mut Communicator, ParticleSet, RefineOperator); 4] = [
            (
                &info.interior_particles,
                &mut self.interior_particles,
                ParticleSet::Domain,
                RefineOperator::ParticleSplit(SplitRole::Interior),
            ),
            (
                &info.level_ghost_particles_old,
                &mut self.level_border_old,
                ParticleSet::LevelGhostOld,
                RefineOperator::ParticleSplit(SplitRole::CoarseBoundaryOld),
            ),
            (
                &info.level_ghost_particles_new,
                &mut self.level_border_new,
                ParticleSet::LevelGhostNew,
                RefineOperator::ParticleSplit(SplitRole::CoarseBoundaryNew),
            ),
            (
                &info.patch_ghost_particles,
                &mut self.patch_ghost_particles,
                ParticleSet::PatchGhost,
                RefineOperator::GhostCopy,
            ),
        ];
        for (populations, communicator, destination, operator) in roles {
            for pop in populations {
                communicator.add(
                    pop.clone(),
                    vec![TransferDescriptor::particles(
                        particle_name(pop, destination),
                        particle_name(pop, ParticleSet::Domain),
                        operator,
                    )],
                )?;
            }
        }
        Ok(())
    }

    /// Build the schedules of `level`. Init and level-border communicators
    /// are skipped on the root level, which has no coarser source.
    pub fn register_level<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
    ) -> Result<(), AmrError> {
        if !self.quantities_registered {
            return Err(AmrError::QuantitiesNotRegistered);
        }
        let patch_level = hierarchy.try_level(level)?;
        if patch_level.patches().is_empty() {
            log::warn!("{}: registering empty level {level}", self.name);
        }
        if level != Self::ROOT_LEVEL && hierarchy.level_of(level - 1).is_none() {
            return Err(AmrError::MissingCoarserLevel { level });
        }

        self.ghost_fields.register_level(hierarchy, level)?;
        self.patch_ghost_particles.register_level(hierarchy, level)?;
        if level != Self::ROOT_LEVEL {
            self.init_fields.register_level(hierarchy, level)?;
            self.interior_particles.register_level(hierarchy, level)?;
            self.level_border_old.register_level(hierarchy, level)?;
            self.level_border_new.register_level(hierarchy, level)?;
        }
        self.levels.insert(level, LevelState::default());
        if self.state == MessengerState::Unregistered {
            self.state = MessengerState::LevelsRegistered;
        }
        log::debug!("{}: registered level {level}", self.name);
        Ok(())
    }

    /// Fill `level` after its boxes changed. `old_level` is the level it
    /// replaces; its patches must still be allocated.
    pub fn regrid<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        old_level: &PatchLevel,
        model: &mut HybridModel,
        time: f64,
    ) -> Result<(), AmrError> {
        if !self.quantities_registered {
            return Err(AmrError::QuantitiesNotRegistered);
        }
        log::debug!("{}: regrid level {level} at t={time}", self.name);
        let resources = &mut model.resources;
        self.init_fields
            .regrid(hierarchy, level, old_level, time, resources)?;
        self.interior_particles
            .regrid(hierarchy, level, old_level, time, resources)?;
        self.ghost_fields.register_level(hierarchy, level)?;
        self.patch_ghost_particles.register_level(hierarchy, level)?;
        if level != Self::ROOT_LEVEL {
            self.clear_particles(
                hierarchy,
                level,
                &mut model.state.ions,
                resources,
                ParticleSet::LevelGhostOld,
            )?;
            self.level_border_old
                .regrid(hierarchy, level, old_level, time, resources)?;
            self.level_border_new.register_level(hierarchy, level)?;
        }
        // level-ghost-new is refilled by the next first_step
        self.copy_level_ghost_old_to_pushable(hierarchy, level, &mut model.state.ions, resources)?;
        self.compute_ion_moments(hierarchy, level, &mut model.state.ions, resources)?;
        self.levels.insert(level, LevelState::default());
        self.state = MessengerState::Steady;
        Ok(())
    }

    /// Bring a new level to a consistent state from the coarser level.
    pub fn init_level<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        model: &mut HybridModel,
        time: f64,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        log::debug!("{}: init level {level} at t={time}", self.name);
        let resources = &mut model.resources;
        let ions = &mut model.state.ions;

        // init schedules also cover patch ghost nodes, so field ghosts need no fill
        self.init_fields.fill(level, time, resources)?;
        self.interior_particles.fill(level, time, resources)?;
        // interior schedules stop at patch interiors
        self.clear_particles(hierarchy, level, ions, resources, ParticleSet::PatchGhost)?;
        self.patch_ghost_particles.fill(level, time, resources)?;
        self.clear_particles(hierarchy, level, ions, resources, ParticleSet::LevelGhostOld)?;
        self.level_border_old.fill(level, time, resources)?;

        self.copy_level_ghost_old_to_pushable(hierarchy, level, ions, resources)?;
        self.compute_ion_moments(hierarchy, level, ions, resources)?;
        self.level_state_mut(level)?.phase = StepPhase::PreStep;
        self.state = MessengerState::Steady;
        Ok(())
    }

    /// Root-level counterpart of [`init_level`](Self::init_level).
    pub fn fill_root_ghosts<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        model: &mut HybridModel,
        time: f64,
    ) -> Result<(), AmrError> {
        if level != Self::ROOT_LEVEL {
            return Err(AmrError::NotRootLevel { level });
        }
        self.level_state(level)?;
        log::debug!("{}: fill root ghosts at t={time}", self.name);
        let resources = &mut model.resources;
        let ions = &mut model.state.ions;
        self.ghost_fields.fill(level, time, resources)?;
        self.clear_particles(hierarchy, level, ions, resources, ParticleSet::PatchGhost)?;
        self.patch_ghost_particles.fill(level, time, resources)?;
        self.compute_ion_moments(hierarchy, level, ions, resources)?;
        self.level_state_mut(level)?.phase = StepPhase::PreStep;
        self.state = MessengerState::Steady;
        Ok(())
    }

    /// Snapshot the model's electromagnetic field into the messenger.
    /// Call once per coarse step, before the level advances.
    pub fn prepare_step<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        model: &mut HybridModel,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        for patch in hierarchy.try_level(level)?.patches() {
            let id = patch.id();
            {
                let mut pair = (&mut model.state.electromag, &mut self.em_old);
                let mut on_patch = model.resources.set_on_patch(id, &mut pair)?;
                let (em, old) = &mut *on_patch;
                old.copy_data(&**em)?;
            }
            let times = model.resources.get_times(&model.state.electromag, id)?;
            if let Some(&t) = times.first() {
                model.resources.set_times(&self.em_old, id, t)?;
            }
        }
        self.level_state_mut(level)?.phase = StepPhase::PreStep;
        log::debug!("{}: prepared step on level {level}", self.name);
        Ok(())
    }

    /// Fill level-border-new particles from the coarser level, which is
    /// already ahead in time, and record the coarse push times.
    pub fn first_step<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        model: &mut HybridModel,
        time: f64,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        let after = if level != Self::ROOT_LEVEL {
            let resources = &mut model.resources;
            self.clear_particles(
                hierarchy,
                level,
                &mut model.state.ions,
                resources,
                ParticleSet::LevelGhostNew,
            )?;
            self.level_border_new.fill(level, time, resources)?;
            let coarser = hierarchy
                .level_of(level - 1)
                .ok_or(AmrError::MissingCoarserLevel { level })?;
            let patch = coarser
                .patches()
                .first()
                .ok_or(AmrError::MissingCoarserLevel { level })?;
            let times = resources.get_times(&model.state.ions, patch.id())?;
            Some(coarse_time(&times, level)?)
        } else {
            None
        };
        let s = self.level_state_mut(level)?;
        // coarser and current level are both at `time` here
        s.before_push_coarse_time = time;
        s.after_push_coarse_time = after;
        s.phase = StepPhase::FirstStep;
        log::debug!("{}: first step on level {level} at t={time}", self.name);
        Ok(())
    }

    /// Rotate level-border-new into level-border-old and reset the pushable set.
    pub fn last_step<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        model: &mut HybridModel,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        for patch in hierarchy.try_level(level)?.patches() {
            let mut ions = model
                .resources
                .set_on_patch(patch.id(), &mut model.state.ions)?;
            for pop in ions.populations_mut() {
                pop.rotate(ParticleSet::LevelGhostNew, ParticleSet::LevelGhostOld)?;
                pop.particles_mut(ParticleSet::LevelGhostNew)?.clear();
                pop.replicate(ParticleSet::LevelGhostOld, ParticleSet::LevelGhost)?;
            }
        }
        self.level_state_mut(level)?.phase = StepPhase::LastStep;
        log::debug!("{}: last step on level {level}", self.name);
        Ok(())
    }

    pub fn fill_magnetic_ghosts(
        &mut self,
        b: &VecField,
        level: usize,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        self.ghost_fields.fill_key(b.name(), level, time, resources)?;
        self.advance_phase(level)
    }

    pub fn fill_electric_ghosts(
        &mut self,
        e: &VecField,
        level: usize,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        self.ghost_fields.fill_key(e.name(), level, time, resources)?;
        self.advance_phase(level)
    }

    /// Rebuild patch-ghost particles of every population from same-level neighbors.
    pub fn fill_ion_ghost_particles<H: PatchHierarchy + ?Sized>(
        &mut self,
        ions: &mut Ions,
        hierarchy: &H,
        level: usize,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        self.clear_particles(hierarchy, level, ions, resources, ParticleSet::PatchGhost)?;
        self.patch_ghost_particles.fill(level, time, resources)?;
        self.advance_phase(level)
    }

    /// Time-interpolation weight of the post-push coarse state at this
    /// level's `after_push_time`.
    pub fn time_interpolation_coefficient(
        &self,
        level: usize,
        before_push_time: f64,
        after_push_time: f64,
    ) -> Result<f64, AmrError> {
        let s = self.level_state(level)?;
        let before = s.before_push_coarse_time;
        let after = s
            .after_push_coarse_time
            .ok_or(AmrError::MissingCoarserLevel { level })?;
        if after == before {
            return Err(AmrError::DegenerateCoarseInterval { before, after });
        }
        Ok((after_push_time - before_push_time) / (after - before))
    }

    /// Deposit ghost-particle moments: patch ghosts with full weight,
    /// level-border-old with `1 − α` and level-border-new with `α`.
    pub fn fill_ion_moment_ghosts<H: PatchHierarchy + ?Sized>(
        &mut self,
        ions: &mut Ions,
        hierarchy: &H,
        level: usize,
        before_push_time: f64,
        after_push_time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let alpha = self.time_interpolation_coefficient(level, before_push_time, after_push_time)?;
        log::debug!("{}: moment ghosts on level {level}, alpha={alpha}", self.name);
        for patch in hierarchy.try_level(level)?.patches() {
            let mut ions = resources.set_on_patch(patch.id(), &mut *ions)?;
            for pop in ions.populations_mut() {
                pop.deposit(ParticleSet::PatchGhost, &self.interpolator, 1.0)?;
                pop.deposit(ParticleSet::LevelGhostOld, &self.interpolator, 1.0 - alpha)?;
                pop.deposit(ParticleSet::LevelGhostNew, &self.interpolator, alpha)?;
            }
        }
        self.advance_phase(level)
    }

    /// Coarsen `b` from `level` onto the next coarser level.
    pub fn sync_magnetic<H: PatchHierarchy + ?Sized>(
        &self,
        b: &VecField,
        hierarchy: &H,
        level: usize,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let fields: Vec<_> = b.component_names().into_iter().zip(b.quantities()).collect();
        self.coarsen_fields(&fields, hierarchy, level, resources)
    }

    /// Coarsen `e` from `level` onto the next coarser level.
    pub fn sync_electric<H: PatchHierarchy + ?Sized>(
        &self,
        e: &VecField,
        hierarchy: &H,
        level: usize,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let fields: Vec<_> = e.component_names().into_iter().zip(e.quantities()).collect();
        self.coarsen_fields(&fields, hierarchy, level, resources)
    }

    /// Coarsen total and per-population moments from `level` onto the next coarser level.
    pub fn sync_ion_moments<H: PatchHierarchy + ?Sized>(
        &self,
        ions: &Ions,
        hierarchy: &H,
        level: usize,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let bulk = ions.bulk_velocity();
        let mut fields = vec![(ions.density_name(), HybridQuantity::Rho)];
        fields.extend(bulk.component_names().into_iter().zip(bulk.quantities()));
        for pop in ions.populations() {
            fields.extend(pop.field_names_and_quantities());
        }
        self.coarsen_fields(&fields, hierarchy, level, resources)
    }

    fn coarsen_fields<H: PatchHierarchy + ?Sized>(
        &self,
        fields: &[(String, HybridQuantity)],
        hierarchy: &H,
        level: usize,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        self.level_state(level)?;
        if level == Self::ROOT_LEVEL {
            return Err(AmrError::MissingCoarserLevel { level });
        }
        let fine = hierarchy.try_level(level)?;
        let coarse = hierarchy
            .level_of(level - 1)
            .ok_or(AmrError::MissingCoarserLevel { level })?;
        let ratio = fine.ratio_to_coarser();
        let order = resources.interp_order();
        for (name, quantity) in fields {
            for f in fine.patches() {
                let covered = covered_coarse_cells(f.cell_box(), ratio);
                if covered.is_empty() {
                    continue;
                }
                let layout = GridLayout::for_cell_box(&covered, order, coarse.mesh_size())?;
                let target = to_field_box(&covered, *quantity, &layout, false);
                let fine_field = resources.patch_data(f.id())?.field(name)?;
                let values: Vec<(IntVect, f64)> = target
                    .indices()
                    .filter_map(|p| coarsen_value(fine_field, &p, ratio).map(|v| (p, v)))
                    .collect();
                for c in coarse.patches() {
                    let interior = to_field_box(c.cell_box(), *quantity, &resources.layout(c)?, false);
                    if !interior.intersects(&target) {
                        continue;
                    }
                    let coarse_field = resources.patch_data_mut(c.id())?.field_mut(name)?;
                    for (p, v) in values.iter().filter(|(p, _)| interior.contains(p)) {
                        coarse_field.set(p, *v);
                    }
                }
            }
        }
        log::debug!("{}: synced {} fields from level {level}", self.name, fields.len());
        Ok(())
    }

    fn clear_particles<H: PatchHierarchy + ?Sized>(
        &self,
        hierarchy: &H,
        level: usize,
        ions: &mut Ions,
        resources: &mut ResourcesManager,
        set: ParticleSet,
    ) -> Result<(), AmrError> {
        for patch in hierarchy.try_level(level)?.patches() {
            let mut ions = resources.set_on_patch(patch.id(), &mut *ions)?;
            for pop in ions.populations_mut() {
                pop.particles_mut(set)?.clear();
            }
        }
        Ok(())
    }

    fn copy_level_ghost_old_to_pushable<H: PatchHierarchy + ?Sized>(
        &self,
        hierarchy: &H,
        level: usize,
        ions: &mut Ions,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        for patch in hierarchy.try_level(level)?.patches() {
            let mut ions = resources.set_on_patch(patch.id(), &mut *ions)?;
            for pop in ions.populations_mut() {
                pop.replicate(ParticleSet::LevelGhostOld, ParticleSet::LevelGhost)?;
            }
        }
        Ok(())
    }

    /// Recompute population moments from domain, patch-ghost and
    /// level-border-old particles, then the total density and bulk velocity.
    fn compute_ion_moments<H: PatchHierarchy + ?Sized>(
        &self,
        hierarchy: &H,
        level: usize,
        ions: &mut Ions,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        for patch in hierarchy.try_level(level)?.patches() {
            let mut ions = resources.set_on_patch(patch.id(), &mut *ions)?;
            for pop in ions.populations_mut() {
                pop.reset_moments()?;
                for set in [
                    ParticleSet::Domain,
                    ParticleSet::PatchGhost,
                    ParticleSet::LevelGhostOld,
                ] {
                    pop.deposit(set, &self.interpolator, 1.0)?;
                }
            }
            ions.compute_density()?;
            ions.compute_bulk_velocity()?;
        }
        Ok(())
    }
}

/// Time recorded by the coarser level's ions.
fn coarse_time(times: &[f64], level: usize) -> Result<f64, AmrError> {
    times
        .first()
        .copied()
        .ok_or(AmrError::MissingCoarserLevel { level })
}
