//! Patches and patch levels: the read-only view of the AMR hierarchy.

use std::fmt;

use crate::amr_error::AmrError;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::index_box::{BoxContainer, IndexBox, MAX_DIM};
use crate::geometry::layout::GridLayout;
use crate::geometry::transform::Transformation;

/// Global patch identifier: level number and a per-hierarchy unique local id.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PatchId {
    pub level: usize,
    pub local: usize,
}

impl PatchId {
    pub fn new(level: usize, local: usize) -> Self {
        Self { level, local }
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}P{}", self.level, self.local)
    }
}

/// One contiguous index-space block of a level.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Patch {
    id: PatchId,
    cell_box: IndexBox,
    mesh_size: [f64; MAX_DIM],
}

impl Patch {
    pub fn new(id: PatchId, cell_box: IndexBox, mesh_size: [f64; MAX_DIM]) -> Self {
        Self {
            id,
            cell_box,
            mesh_size,
        }
    }

    pub fn id(&self) -> PatchId {
        self.id
    }

    pub fn level_number(&self) -> usize {
        self.id.level
    }

    pub fn cell_box(&self) -> &IndexBox {
        &self.cell_box
    }

    pub fn mesh_size(&self) -> [f64; MAX_DIM] {
        self.mesh_size
    }

    /// Grid layout of this patch for the given interpolation order.
    pub fn layout(&self, interp_order: u32) -> Result<GridLayout, AmrError> {
        GridLayout::for_cell_box(&self.cell_box, interp_order, self.mesh_size)
    }
}

/// One resolution of the hierarchy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatchLevel {
    number: usize,
    patches: Vec<Patch>,
    ratio_to_coarser: i32,
    domain: IndexBox,
    periodic: [bool; MAX_DIM],
    mesh_size: [f64; MAX_DIM],
}

impl PatchLevel {
    pub fn new(
        number: usize,
        patches: Vec<Patch>,
        ratio_to_coarser: i32,
        domain: IndexBox,
        periodic: [bool; MAX_DIM],
        mesh_size: [f64; MAX_DIM],
    ) -> Self {
        Self {
            number,
            patches,
            ratio_to_coarser,
            domain,
            periodic,
            mesh_size,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn is_root(&self) -> bool {
        self.number == 0
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.iter().find(|p| p.id == id)
    }

    /// Refinement ratio relative to the next coarser level (1 on the root).
    pub fn ratio_to_coarser(&self) -> i32 {
        self.ratio_to_coarser
    }

    /// Physical domain expressed in this level's index space.
    pub fn domain(&self) -> &IndexBox {
        &self.domain
    }

    pub fn periodic(&self) -> [bool; MAX_DIM] {
        self.periodic
    }

    pub fn mesh_size(&self) -> [f64; MAX_DIM] {
        self.mesh_size
    }

    pub fn dim(&self) -> usize {
        self.domain.dim()
    }

    pub fn boxes(&self) -> BoxContainer {
        self.patches.iter().map(|p| p.cell_box).collect()
    }

    /// Identity followed by every periodic image translation of this level.
    ///
    /// Each periodic axis contributes `{-L, 0, +L}` where `L` is the domain
    /// extent along that axis; all combinations except the all-zero one are
    /// appended after the identity.
    pub fn periodic_shifts(&self) -> Vec<Transformation> {
        let dim = self.dim();
        let mut shifts = vec![Transformation::identity(dim)];
        let choices: Vec<Vec<i32>> = (0..dim)
            .map(|a| {
                let extent = self.domain.number_of_cells(a) as i32;
                if self.periodic[a] && extent > 0 {
                    vec![0, -extent, extent]
                } else {
                    vec![0]
                }
            })
            .collect();
        let mut offset = vec![0; dim];
        Self::push_combinations(&choices, 0, &mut offset, &mut shifts);
        shifts
    }

    fn push_combinations(
        choices: &[Vec<i32>],
        axis: usize,
        offset: &mut Vec<i32>,
        out: &mut Vec<Transformation>,
    ) {
        if axis == choices.len() {
            if offset.iter().any(|&o| o != 0) {
                out.push(Transformation::translation(offset));
            }
            return;
        }
        for &c in &choices[axis] {
            offset[axis] = c;
            Self::push_combinations(choices, axis + 1, offset, out);
        }
    }
}

impl DebugInvariants for PatchLevel {
    fn validate_invariants(&self) -> Result<(), AmrError> {
        for (i, p) in self.patches.iter().enumerate() {
            if p.level_number() != self.number {
                return Err(AmrError::InvariantViolation(format!(
                    "patch {} listed on level {}",
                    p.id(),
                    self.number
                )));
            }
            if !self.domain.contains_box(p.cell_box()) {
                return Err(AmrError::InvariantViolation(format!(
                    "patch {} {} leaves domain {}",
                    p.id(),
                    p.cell_box(),
                    self.domain
                )));
            }
            if let Some(q) = self.patches[i + 1..]
                .iter()
                .find(|q| q.cell_box().intersects(p.cell_box()))
            {
                return Err(AmrError::InvariantViolation(format!(
                    "patches {} and {} overlap",
                    p.id(),
                    q.id()
                )));
            }
        }
        Ok(())
    }
}
