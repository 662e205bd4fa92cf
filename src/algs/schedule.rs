//! Refine schedules: precomputed transfers between patches, executed
//! synchronously against a [`ResourcesManager`].
//!
//! A schedule is built once per level and descriptor from the hierarchy
//! shape. Every transfer carries the [`BoxOverlap`] saying where to write and
//! how source indices map to destination indices; executing the schedule
//! only moves data.
//!
//! Execution runs in two phases. All payloads are first gathered from a
//! read-only view of the resources (in parallel with the `rayon` feature),
//! then written in transfer order. Coarse-level transfers are always ordered
//! before same-level copies so that neighbor data wins where both apply.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::algs::communicator::{TransferData, TransferDescriptor};
use crate::algs::refine::{refine_value, time_interpolate, time_weight};
use crate::algs::split::SplitPattern;
use crate::amr_error::AmrError;
use crate::data::field::Field;
use crate::data::particles::{Particle, ParticleArray};
use crate::geometry::field_geometry::{
    FieldGeometry, OverlapRequest, ParticleGeometry, PatchGeometry, calculate_overlap,
};
use crate::geometry::index_box::{BoxContainer, IndexBox, IntVect, MAX_DIM};
use crate::geometry::layout::{GridLayout, HybridQuantity, to_field_box};
use crate::geometry::transform::Transformation;
use crate::hierarchy::patch::{Patch, PatchId, PatchLevel};
use crate::hierarchy::resources::ResourcesManager;
use crate::overlap::overlap::BoxOverlap;

/// Something that moves data between patches and blocks until it is done.
pub trait Schedule {
    fn execute(&self, resources: &mut ResourcesManager, time: f64) -> Result<(), AmrError>;

    /// Number of patch-to-patch transfers.
    fn transfer_count(&self) -> usize;
}

/// One patch-to-patch data movement.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Transfer {
    /// Same-level (or old-level) copy of the overlap region.
    Copy {
        destination: PatchId,
        source: PatchId,
        overlap: BoxOverlap,
    },
    /// Coarse field data gathered into a scratch field, then refined into `boxes`.
    Refine {
        destination: PatchId,
        boxes: BoxContainer,
        scratch: IndexBox,
        sources: Vec<(PatchId, BoxOverlap)>,
        ratio: i32,
    },
    /// Coarse particles split into fine particles landing in the overlap.
    Split {
        destination: PatchId,
        source: PatchId,
        overlap: BoxOverlap,
        ratio: i32,
    },
}

impl Transfer {
    fn destination(&self) -> PatchId {
        match self {
            Transfer::Copy { destination, .. }
            | Transfer::Refine { destination, .. }
            | Transfer::Split { destination, .. } => *destination,
        }
    }
}

enum Payload {
    Values(Vec<(IntVect, f64)>),
    Particles(ParticleArray),
}

/// Transfers of one descriptor on one level.
#[derive(Clone, Debug, PartialEq)]
pub struct RefineSchedule {
    descriptor: TransferDescriptor,
    split: SplitPattern,
    dim: usize,
    transfers: Vec<Transfer>,
}

impl RefineSchedule {
    pub(crate) fn new(
        descriptor: TransferDescriptor,
        split: SplitPattern,
        dim: usize,
        transfers: Vec<Transfer>,
    ) -> Self {
        Self {
            descriptor,
            split,
            dim,
            transfers,
        }
    }

    pub fn descriptor(&self) -> &TransferDescriptor {
        &self.descriptor
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    fn gather(
        &self,
        transfer: &Transfer,
        resources: &ResourcesManager,
        time: f64,
    ) -> Result<Payload, AmrError> {
        match (&self.descriptor.data, transfer) {
            (
                TransferData::Field {
                    destination,
                    quantity,
                    ..
                },
                Transfer::Copy {
                    source: patch,
                    overlap,
                    ..
                },
            ) => {
                // neighbors hold the destination quantity itself
                let field = resources.patch_data(*patch)?.field(destination)?;
                Ok(Payload::Values(copy_values(field, overlap, *quantity)))
            }
            (
                TransferData::Field {
                    source,
                    old_source,
                    quantity,
                    ..
                },
                Transfer::Refine {
                    boxes,
                    scratch,
                    sources,
                    ratio,
                    ..
                },
            ) => {
                let mut coarse = Field::new("scratch", *quantity, *scratch);
                for (patch, overlap) in sources {
                    let data = resources.patch_data(*patch)?;
                    let new = data.field(source)?;
                    let interpolated = match old_source {
                        Some(old_name) => {
                            let old = data.field(old_name)?;
                            let beta = time_weight(data.time(old_name)?, data.time(source)?, time);
                            Some((old, beta))
                        }
                        None => None,
                    };
                    let inverse = overlap.transformation().inverse();
                    let centering = quantity.centering();
                    for p in overlap.destination_indices() {
                        let sp = inverse.apply_index(&p, &centering);
                        if let Some(v) = coarse_sample(new, interpolated, &sp)? {
                            coarse.set(&p, v);
                        }
                    }
                }
                let values = boxes
                    .iter()
                    .flat_map(IndexBox::indices)
                    .filter_map(|p| refine_value(&coarse, &p, *ratio).map(|v| (p, v)))
                    .collect();
                Ok(Payload::Values(values))
            }
            (
                TransferData::Particles { source, .. },
                Transfer::Copy {
                    source: patch,
                    overlap,
                    ..
                },
            ) => {
                let particles = resources.patch_data(*patch)?.particles(source)?;
                let t = overlap.transformation();
                let boxes = overlap.destination_boxes();
                Ok(Payload::Particles(
                    particles
                        .iter()
                        .map(|p| p.transformed(t))
                        .filter(|p| boxes.contains(&p.i_cell))
                        .collect(),
                ))
            }
            (
                TransferData::Particles { source, .. },
                Transfer::Split {
                    source: patch,
                    overlap,
                    ratio,
                    ..
                },
            ) => {
                let particles = resources.patch_data(*patch)?.particles(source)?;
                Ok(Payload::Particles(split_into(
                    particles,
                    overlap,
                    *ratio,
                    self.split,
                    self.dim,
                )))
            }
            _ => Err(AmrError::InvalidConfig(format!(
                "transfer kind does not match descriptor `{}`",
                self.descriptor.destination_name()
            ))),
        }
    }

    fn apply(
        &self,
        destination: PatchId,
        payload: Payload,
        resources: &mut ResourcesManager,
    ) -> Result<(), AmrError> {
        let data = resources.patch_data_mut(destination)?;
        let name = self.descriptor.destination_name();
        match payload {
            Payload::Values(values) => {
                let field = data.field_mut(name)?;
                for (p, v) in values {
                    field.set(&p, v);
                }
            }
            Payload::Particles(particles) => {
                data.particles_mut(name)?.extend(particles);
            }
        }
        Ok(())
    }
}

impl Schedule for RefineSchedule {
    fn execute(&self, resources: &mut ResourcesManager, time: f64) -> Result<(), AmrError> {
        log::trace!(
            "executing {} transfers into `{}` at t={time}",
            self.transfers.len(),
            self.descriptor.destination_name()
        );
        let view: &ResourcesManager = resources;
        #[cfg(feature = "rayon")]
        let payloads = self
            .transfers
            .par_iter()
            .map(|t| self.gather(t, view, time))
            .collect::<Result<Vec<_>, AmrError>>()?;
        #[cfg(not(feature = "rayon"))]
        let payloads = self
            .transfers
            .iter()
            .map(|t| self.gather(t, view, time))
            .collect::<Result<Vec<_>, AmrError>>()?;
        for (t, payload) in self.transfers.iter().zip(payloads) {
            self.apply(t.destination(), payload, resources)?;
        }
        Ok(())
    }

    fn transfer_count(&self) -> usize {
        self.transfers.len()
    }
}

/// Sample of `new` at `p`, blended in time with `old` when given.
///
/// `None` where `new` has no sample. Old and new coarse fields share one
/// ghost box, so an old snapshot missing a sample of `new` is an error.
fn coarse_sample(
    new: &Field,
    old: Option<(&Field, f64)>,
    p: &IntVect,
) -> Result<Option<f64>, AmrError> {
    let Some(vn) = new.get(p) else {
        return Ok(None);
    };
    match old {
        None => Ok(Some(vn)),
        Some((old, beta)) => {
            let vo = old.get(p).ok_or_else(|| {
                AmrError::InvariantViolation(format!(
                    "`{}` has no sample at {p:?} where `{}` has one",
                    old.name(),
                    new.name()
                ))
            })?;
            Ok(Some(time_interpolate(vo, vn, beta)))
        }
    }
}

fn copy_values(field: &Field, overlap: &BoxOverlap, quantity: HybridQuantity) -> Vec<(IntVect, f64)> {
    let inverse = overlap.transformation().inverse();
    let centering = quantity.centering();
    overlap
        .destination_indices()
        .filter_map(|p| field.get(&inverse.apply_index(&p, &centering)).map(|v| (p, v)))
        .collect()
}

fn split_into(
    coarse: &[Particle],
    overlap: &BoxOverlap,
    ratio: i32,
    pattern: SplitPattern,
    dim: usize,
) -> ParticleArray {
    let t = overlap.transformation();
    let boxes = overlap.destination_boxes();
    let near: BoxContainer = boxes.iter().map(|b| b.grow(1)).collect();
    let mut children = ParticleArray::new();
    let mut out = ParticleArray::new();
    for parent in coarse {
        let mut x = parent.position();
        for xa in x.iter_mut().take(dim) {
            *xa *= f64::from(ratio);
        }
        let image = Particle::at_position(parent.weight, parent.charge, x, parent.v).transformed(t);
        if !near.contains(&image.i_cell) {
            continue;
        }
        children.clear();
        pattern.split(parent, ratio, dim, &mut children);
        out.extend(
            children
                .iter()
                .map(|c| c.transformed(t))
                .filter(|c| boxes.contains(&c.i_cell)),
        );
    }
    out
}

/// Which part of a fine patch a coarse-level transfer must cover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum CoarseFill<'a> {
    /// The whole patch (interior and ghosts for fields, interior for particles).
    Everywhere,
    /// Only the ghost region not covered by any patch of the level.
    LevelBorder,
    /// Like `Everywhere`, minus the given cell boxes (particles only).
    Excluding(&'a BoxContainer),
}

/// Which part of a patch a same-level transfer must cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SameLevelFill {
    /// Ghost region, from every neighbor and periodic image.
    Ghosts,
    /// Everything the source covers, from the unshifted source (regrid copy).
    Interior,
}

/// Builds the transfers of one descriptor for one destination level.
pub(crate) struct ScheduleBuilder<'a> {
    pub descriptor: &'a TransferDescriptor,
    pub level: &'a PatchLevel,
    pub interp_order: u32,
    pub particle_ghost_width: u32,
}

impl ScheduleBuilder<'_> {
    fn field_ghost_width(&self) -> i32 {
        self.interp_order.div_ceil(2) as i32
    }

    fn layout(&self, cell_box: &IndexBox, mesh_size: [f64; MAX_DIM]) -> Result<GridLayout, AmrError> {
        GridLayout::for_cell_box(cell_box, self.interp_order, mesh_size)
    }

    fn geometry(
        &self,
        cell_box: IndexBox,
        mesh_size: [f64; MAX_DIM],
    ) -> Result<PatchGeometry, AmrError> {
        Ok(match &self.descriptor.data {
            TransferData::Field { quantity, .. } => PatchGeometry::Field(FieldGeometry::new(
                cell_box,
                self.layout(&cell_box, mesh_size)?,
                *quantity,
            )),
            TransferData::Particles { .. } => {
                PatchGeometry::Particles(ParticleGeometry::new(cell_box, self.particle_ghost_width))
            }
        })
    }

    /// Cells within `width` of `patch` not covered by any patch of the level
    /// or one of its periodic images.
    fn level_border(&self, patch: &Patch, width: i32) -> BoxContainer {
        let mut border: BoxContainer = [patch.cell_box().grow(width)].into_iter().collect();
        for t in self.level.periodic_shifts() {
            for other in self.level.patches() {
                border.remove_intersections(&t.apply_box(other.cell_box()));
            }
        }
        border
    }

    /// Copies from `source_level` (this level, or the level it replaces).
    pub fn same_level(
        &self,
        source_level: &PatchLevel,
        fill: SameLevelFill,
    ) -> Result<Vec<Transfer>, AmrError> {
        let shifts = match fill {
            SameLevelFill::Ghosts => self.level.periodic_shifts(),
            SameLevelFill::Interior => vec![Transformation::identity(self.level.dim())],
        };
        let mut transfers = Vec::new();
        for d in self.level.patches() {
            let destination = self.geometry(*d.cell_box(), d.mesh_size())?;
            let interior: BoxContainer = match (&self.descriptor.data, fill) {
                (TransferData::Particles { .. }, SameLevelFill::Interior) => {
                    [*d.cell_box()].into_iter().collect()
                }
                _ => BoxContainer::new(),
            };
            for s in source_level.patches() {
                let source = self.geometry(*s.cell_box(), s.mesh_size())?;
                for t in &shifts {
                    if fill == SameLevelFill::Ghosts && t.is_identity() && s.id() == d.id() {
                        continue;
                    }
                    let request = OverlapRequest {
                        source_mask: *s.cell_box(),
                        fill_box: *d.cell_box(),
                        overwrite_interior: fill == SameLevelFill::Interior,
                        transformation: *t,
                        restrict_boxes: &interior,
                    };
                    let overlap = calculate_overlap(&destination, &source, &request, true);
                    if !overlap.is_empty() {
                        transfers.push(Transfer::Copy {
                            destination: d.id(),
                            source: s.id(),
                            overlap,
                        });
                    }
                }
            }
        }
        Ok(transfers)
    }

    /// Refinement (fields) or splitting (particles) from the next coarser level.
    pub fn from_coarser(
        &self,
        coarser: &PatchLevel,
        fill: CoarseFill<'_>,
    ) -> Result<Vec<Transfer>, AmrError> {
        match self.descriptor.data {
            TransferData::Field { quantity, .. } => self.refine_fields(coarser, fill, quantity),
            TransferData::Particles { .. } => self.split_particles(coarser, fill),
        }
    }

    fn refine_fields(
        &self,
        coarser: &PatchLevel,
        fill: CoarseFill<'_>,
        quantity: HybridQuantity,
    ) -> Result<Vec<Transfer>, AmrError> {
        let ratio = self.level.ratio_to_coarser();
        let ghosts = self.field_ghost_width();
        let border_only = fill == CoarseFill::LevelBorder;
        let mut transfers = Vec::new();
        for d in self.level.patches() {
            let restrict = if border_only {
                let border = self.level_border(d, ghosts);
                if border.is_empty() {
                    continue;
                }
                border
            } else {
                BoxContainer::new()
            };
            let destination = self.geometry(*d.cell_box(), d.mesh_size())?;
            let mut boxes = BoxContainer::new();
            for c in coarser.patches() {
                let refined = c.cell_box().refine(ratio);
                let source = self.geometry(refined, self.level.mesh_size())?;
                for t in self.level.periodic_shifts() {
                    let request = OverlapRequest {
                        source_mask: refined,
                        fill_box: *d.cell_box(),
                        overwrite_interior: !border_only,
                        transformation: t,
                        restrict_boxes: &restrict,
                    };
                    for b in calculate_overlap(&destination, &source, &request, true)
                        .destination_boxes()
                    {
                        boxes.push(*b);
                    }
                }
            }
            if boxes.is_empty() {
                continue;
            }

            let scratch_cells = d.cell_box().grow(ghosts + 1).coarsen(ratio).grow(1);
            let scratch_layout = self.layout(&scratch_cells, coarser.mesh_size())?;
            let scratch = PatchGeometry::Field(FieldGeometry::new(
                scratch_cells,
                scratch_layout.clone(),
                quantity,
            ));
            let none = BoxContainer::new();
            let mut sources = Vec::new();
            for c in coarser.patches() {
                let source = self.geometry(*c.cell_box(), c.mesh_size())?;
                for t in coarser.periodic_shifts() {
                    let request = OverlapRequest {
                        source_mask: *c.cell_box(),
                        fill_box: scratch_cells,
                        overwrite_interior: true,
                        transformation: t,
                        restrict_boxes: &none,
                    };
                    let overlap = calculate_overlap(&scratch, &source, &request, true);
                    if !overlap.is_empty() {
                        sources.push((c.id(), overlap));
                    }
                }
            }
            transfers.push(Transfer::Refine {
                destination: d.id(),
                boxes,
                scratch: to_field_box(&scratch_cells, quantity, &scratch_layout, true),
                sources,
                ratio,
            });
        }
        Ok(transfers)
    }

    fn split_particles(
        &self,
        coarser: &PatchLevel,
        fill: CoarseFill<'_>,
    ) -> Result<Vec<Transfer>, AmrError> {
        let ratio = self.level.ratio_to_coarser();
        let mut transfers = Vec::new();
        for d in self.level.patches() {
            let region = match fill {
                CoarseFill::Everywhere => [*d.cell_box()].into_iter().collect(),
                CoarseFill::LevelBorder => {
                    self.level_border(d, self.particle_ghost_width as i32)
                }
                CoarseFill::Excluding(excluded) => {
                    let mut region: BoxContainer = [*d.cell_box()].into_iter().collect();
                    region.remove_all(excluded);
                    region
                }
            };
            if region.is_empty() {
                continue;
            }
            let destination = self.geometry(*d.cell_box(), d.mesh_size())?;
            for c in coarser.patches() {
                // children land at most one fine cell away from the refined parent
                let landing = c.cell_box().refine(ratio).grow(1);
                let source = self.geometry(landing, self.level.mesh_size())?;
                for t in self.level.periodic_shifts() {
                    let request = OverlapRequest {
                        source_mask: landing,
                        fill_box: *d.cell_box(),
                        overwrite_interior: fill != CoarseFill::LevelBorder,
                        transformation: t,
                        restrict_boxes: &region,
                    };
                    let overlap = calculate_overlap(&destination, &source, &request, true);
                    if !overlap.is_empty() {
                        transfers.push(Transfer::Split {
                            destination: d.id(),
                            source: c.id(),
                            overlap,
                            ratio,
                        });
                    }
                }
            }
        }
        Ok(transfers)
    }
}
