//! Communicators: named groups of transfer descriptors sharing one role,
//! plus the per-level schedules built from them.
//!
//! A communicator is filled in two stages. Descriptors are added once, when
//! the model declares its quantities; schedules are (re)built every time a
//! level is registered, since they depend on the patch layout. Filling then
//! executes the schedules of one level, for all keys or for a single key.

use std::collections::BTreeMap;

use crate::algs::schedule::{
    CoarseFill, RefineSchedule, SameLevelFill, Schedule, ScheduleBuilder, Transfer,
};
use crate::algs::split::{SplitPattern, SplitRole};
use crate::amr_error::AmrError;
use crate::geometry::layout::HybridQuantity;
use crate::hierarchy::hierarchy::PatchHierarchy;
use crate::hierarchy::patch::PatchLevel;
use crate::hierarchy::resources::ResourcesManager;

/// What a communicator is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CommunicationRole {
    /// Field ghosts: neighbors, then the time-interpolated coarser level at level borders.
    GhostField,
    /// Fields of a new or regridded level, refined from the coarser level.
    InitField,
    /// Domain particles of a new or regridded level, split from the coarser level.
    InitInteriorParticles,
    /// Level-ghost particles split from the coarser level before its push.
    LevelBorderParticlesOld,
    /// Level-ghost particles split from the coarser level after its push.
    LevelBorderParticlesNew,
    /// Patch-ghost particles copied from same-level neighbors.
    InteriorGhostParticles,
}

impl CommunicationRole {
    pub fn name(self) -> &'static str {
        match self {
            CommunicationRole::GhostField => "ghostField",
            CommunicationRole::InitField => "initField",
            CommunicationRole::InitInteriorParticles => "interiorParticles",
            CommunicationRole::LevelBorderParticlesOld => "levelBorderParticlesOld",
            CommunicationRole::LevelBorderParticlesNew => "levelBorderParticlesNew",
            CommunicationRole::InteriorGhostParticles => "interiorGhostParticles",
        }
    }

    fn coarse_fill(self) -> Option<CoarseFill<'static>> {
        match self {
            CommunicationRole::GhostField
            | CommunicationRole::LevelBorderParticlesOld
            | CommunicationRole::LevelBorderParticlesNew => Some(CoarseFill::LevelBorder),
            CommunicationRole::InitField | CommunicationRole::InitInteriorParticles => {
                Some(CoarseFill::Everywhere)
            }
            CommunicationRole::InteriorGhostParticles => None,
        }
    }

    fn fills_from_neighbors(self) -> bool {
        matches!(
            self,
            CommunicationRole::GhostField | CommunicationRole::InteriorGhostParticles
        )
    }

    fn seeds_from_old_level(self) -> bool {
        matches!(
            self,
            CommunicationRole::InitField | CommunicationRole::InitInteriorParticles
        )
    }

    fn expects_particles(self) -> bool {
        !matches!(
            self,
            CommunicationRole::GhostField | CommunicationRole::InitField
        )
    }
}

/// How destination data is produced from source data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RefineOperator {
    /// Plain copy between patches of one level.
    GhostCopy,
    /// Space refinement of coarse data.
    FieldRefine,
    /// Space refinement of coarse data interpolated between two times.
    TimeInterpolatedRefine,
    /// Coarse particles split into fine ones.
    ParticleSplit(SplitRole),
}

/// Names of the source and destination resources of a transfer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TransferData {
    Field {
        destination: String,
        source: String,
        /// Older source sample, for time interpolation.
        old_source: Option<String>,
        quantity: HybridQuantity,
    },
    Particles {
        destination: String,
        source: String,
    },
}

/// One quantity to move, and how.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransferDescriptor {
    pub data: TransferData,
    pub operator: RefineOperator,
}

impl TransferDescriptor {
    pub fn field(
        destination: impl Into<String>,
        source: impl Into<String>,
        old_source: Option<String>,
        quantity: HybridQuantity,
        operator: RefineOperator,
    ) -> Self {
        Self {
            data: TransferData::Field {
                destination: destination.into(),
                source: source.into(),
                old_source,
                quantity,
            },
            operator,
        }
    }

    pub fn particles(
        destination: impl Into<String>,
        source: impl Into<String>,
        operator: RefineOperator,
    ) -> Self {
        Self {
            data: TransferData::Particles {
                destination: destination.into(),
                source: source.into(),
            },
            operator,
        }
    }

    pub fn destination_name(&self) -> &str {
        match &self.data {
            TransferData::Field { destination, .. } | TransferData::Particles { destination, .. } => {
                destination
            }
        }
    }

    pub fn source_name(&self) -> &str {
        match &self.data {
            TransferData::Field { source, .. } | TransferData::Particles { source, .. } => source,
        }
    }

    fn validate(&self) -> Result<(), AmrError> {
        let ok = match (&self.data, self.operator) {
            (TransferData::Field { old_source, .. }, RefineOperator::TimeInterpolatedRefine) => {
                old_source.is_some()
            }
            (TransferData::Field { .. }, RefineOperator::GhostCopy | RefineOperator::FieldRefine) => {
                true
            }
            (
                TransferData::Particles { .. },
                RefineOperator::GhostCopy | RefineOperator::ParticleSplit(_),
            ) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(AmrError::InvalidConfig(format!(
                "operator {:?} cannot transfer `{}`",
                self.operator,
                self.destination_name()
            )))
        }
    }
}

/// Descriptors of one role, keyed by quantity name, and their schedules per level.
#[derive(Clone, Debug)]
pub struct Communicator {
    role: CommunicationRole,
    split: SplitPattern,
    interp_order: u32,
    particle_ghost_width: u32,
    descriptors: BTreeMap<String, Vec<TransferDescriptor>>,
    schedules: BTreeMap<usize, BTreeMap<String, Vec<RefineSchedule>>>,
}

impl Communicator {
    pub fn new(
        role: CommunicationRole,
        split: SplitPattern,
        interp_order: u32,
        particle_ghost_width: u32,
    ) -> Self {
        Self {
            role,
            split,
            interp_order,
            particle_ghost_width,
            descriptors: BTreeMap::new(),
            schedules: BTreeMap::new(),
        }
    }

    pub fn role(&self) -> CommunicationRole {
        self.role
    }

    /// Add the descriptors of quantity `key`. Existing schedules are dropped.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        descriptors: Vec<TransferDescriptor>,
    ) -> Result<(), AmrError> {
        for d in &descriptors {
            d.validate()?;
            let is_particles = matches!(d.data, TransferData::Particles { .. });
            if is_particles != self.role.expects_particles() {
                return Err(AmrError::InvalidConfig(format!(
                    "`{}` does not fit communicator {}",
                    d.destination_name(),
                    self.role.name()
                )));
            }
        }
        let key = key.into();
        log::debug!("{}: adding `{key}`", self.role.name());
        self.descriptors.entry(key).or_default().extend(descriptors);
        self.schedules.clear();
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn is_registered(&self, level: usize) -> bool {
        self.schedules.contains_key(&level)
    }

    /// Number of transfers scheduled on `level`, over all keys.
    pub fn transfer_count(&self, level: usize) -> usize {
        self.schedules
            .get(&level)
            .map(|by_key| {
                by_key
                    .values()
                    .flatten()
                    .map(Schedule::transfer_count)
                    .sum()
            })
            .unwrap_or(0)
    }

    fn builder<'a>(&self, descriptor: &'a TransferDescriptor, level: &'a PatchLevel) -> ScheduleBuilder<'a> {
        ScheduleBuilder {
            descriptor,
            level,
            interp_order: self.interp_order,
            particle_ghost_width: self.particle_ghost_width,
        }
    }

    fn schedule(&self, descriptor: &TransferDescriptor, transfers: Vec<Transfer>, dim: usize) -> RefineSchedule {
        RefineSchedule::new(descriptor.clone(), self.split, dim, transfers)
    }

    /// (Re)build the schedules of `level` from the current hierarchy.
    pub fn register_level<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
    ) -> Result<(), AmrError> {
        let patch_level = hierarchy.try_level(level)?;
        let coarser = if level > 0 {
            Some(hierarchy.try_level(level - 1)?)
        } else {
            None
        };
        let mut by_key = BTreeMap::new();
        for (key, descriptors) in &self.descriptors {
            let mut schedules = Vec::with_capacity(descriptors.len());
            for d in descriptors {
                let builder = self.builder(d, patch_level);
                let mut transfers = Vec::new();
                if let (Some(coarser), Some(fill)) = (coarser, self.role.coarse_fill()) {
                    transfers.extend(builder.from_coarser(coarser, fill)?);
                }
                if self.role.fills_from_neighbors() {
                    transfers.extend(builder.same_level(patch_level, SameLevelFill::Ghosts)?);
                }
                schedules.push(self.schedule(d, transfers, patch_level.dim()));
            }
            by_key.insert(key.clone(), schedules);
        }
        log::debug!(
            "{}: registered level {level} ({} keys)",
            self.role.name(),
            by_key.len()
        );
        self.schedules.insert(level, by_key);
        Ok(())
    }

    fn level_schedules(
        &self,
        level: usize,
    ) -> Result<&BTreeMap<String, Vec<RefineSchedule>>, AmrError> {
        self.schedules
            .get(&level)
            .ok_or(AmrError::LevelNotRegistered { level })
    }

    /// Execute every schedule of `level`.
    pub fn fill(
        &self,
        level: usize,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        for schedule in self.level_schedules(level)?.values().flatten() {
            schedule.execute(resources, time)?;
        }
        Ok(())
    }

    /// Execute the schedules of quantity `key` on `level`.
    pub fn fill_key(
        &self,
        key: &str,
        level: usize,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let schedules = self
            .level_schedules(level)?
            .get(key)
            .ok_or_else(|| AmrError::UnknownQuantity(key.to_string()))?;
        for schedule in schedules {
            schedule.execute(resources, time)?;
        }
        Ok(())
    }

    /// Fill `level` after a regrid. Init roles refine from the coarser level
    /// where the old level did not exist, then copy from `old_level` wherever
    /// it overlaps; border roles refill the level border from the coarser
    /// level. Schedules of `level` are rebuilt afterwards.
    pub fn regrid<H: PatchHierarchy + ?Sized>(
        &mut self,
        hierarchy: &H,
        level: usize,
        old_level: &PatchLevel,
        time: f64,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let patch_level = hierarchy.try_level(level)?;
        let old_boxes = old_level.boxes();
        for descriptor in self.descriptors.values().flatten() {
            let builder = self.builder(descriptor, patch_level);
            let mut transfers = Vec::new();
            let fill = match (self.role.coarse_fill(), &descriptor.data) {
                (Some(CoarseFill::Everywhere), TransferData::Particles { .. }) => {
                    Some(CoarseFill::Excluding(&old_boxes))
                }
                (fill, _) => fill,
            };
            if let (true, Some(fill)) = (level > 0, fill) {
                let coarser = hierarchy.try_level(level - 1)?;
                transfers.extend(builder.from_coarser(coarser, fill)?);
            }
            if self.role.seeds_from_old_level() {
                transfers.extend(builder.same_level(old_level, SameLevelFill::Interior)?);
            }
            self.schedule(descriptor, transfers, patch_level.dim())
                .execute(resources, time)?;
        }
        log::debug!("{}: regridded level {level}", self.role.name());
        self.register_level(hierarchy, level)
    }
}
