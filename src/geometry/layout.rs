//! Quantity centering and the cell-box → field-box mapping.
//!
//! Every physical quantity lives either on cell faces/corners (primal, node
//! aligned) or on cell centers (dual) along each axis. An `N`-cell box holds
//! `N + 1` primal samples and `N` dual samples; ghost layers add
//! [`GridLayout::nbr_ghosts`] samples on both sides.
//!
//! [`to_field_box`] is the only place where cell boxes are turned into field
//! boxes. Boxes of different quantities can only be compared after going
//! through it.

use crate::amr_error::AmrError;
use crate::geometry::index_box::{IndexBox, MAX_DIM};

/// Sample position along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Centering {
    /// Node aligned.
    Primal,
    /// Cell aligned.
    Dual,
}

/// Physical quantities of the hybrid model.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum HybridQuantity {
    Bx,
    By,
    Bz,
    Ex,
    Ey,
    Ez,
    Rho,
    Vx,
    Vy,
    Vz,
    Fx,
    Fy,
    Fz,
}

impl HybridQuantity {
    /// Yee-lattice centering on each axis.
    pub fn centering(self) -> [Centering; MAX_DIM] {
        use Centering::{Dual as D, Primal as P};
        match self {
            HybridQuantity::Bx => [P, D, D],
            HybridQuantity::By => [D, P, D],
            HybridQuantity::Bz => [D, D, P],
            HybridQuantity::Ex => [D, P, P],
            HybridQuantity::Ey => [P, D, P],
            HybridQuantity::Ez => [P, P, D],
            _ => [P, P, P],
        }
    }

    pub fn magnetic() -> [HybridQuantity; 3] {
        [HybridQuantity::Bx, HybridQuantity::By, HybridQuantity::Bz]
    }

    pub fn electric() -> [HybridQuantity; 3] {
        [HybridQuantity::Ex, HybridQuantity::Ey, HybridQuantity::Ez]
    }

    pub fn bulk_velocity() -> [HybridQuantity; 3] {
        [HybridQuantity::Vx, HybridQuantity::Vy, HybridQuantity::Vz]
    }

    pub fn flux() -> [HybridQuantity; 3] {
        [HybridQuantity::Fx, HybridQuantity::Fy, HybridQuantity::Fz]
    }
}

/// Grid description of one patch (or of a box on that patch's level).
///
/// Only `dim`, `interp_order` and the cell counts enter index computations;
/// spacing and origin may differ between levels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridLayout {
    dim: usize,
    interp_order: u32,
    mesh_size: [f64; MAX_DIM],
    origin: [f64; MAX_DIM],
    nb_cells: [u32; MAX_DIM],
}

impl GridLayout {
    pub fn new(
        dim: usize,
        interp_order: u32,
        mesh_size: [f64; MAX_DIM],
        origin: [f64; MAX_DIM],
        nb_cells: [u32; MAX_DIM],
    ) -> Result<Self, AmrError> {
        if !(1..=MAX_DIM).contains(&dim) {
            return Err(AmrError::InvalidDimension(dim));
        }
        if !(1..=3).contains(&interp_order) {
            return Err(AmrError::UnsupportedInterpOrder(interp_order));
        }
        Ok(Self {
            dim,
            interp_order,
            mesh_size,
            origin,
            nb_cells,
        })
    }

    /// Layout of a cell box on a level with spacing `mesh_size`.
    pub fn for_cell_box(
        cell_box: &IndexBox,
        interp_order: u32,
        mesh_size: [f64; MAX_DIM],
    ) -> Result<Self, AmrError> {
        let dim = cell_box.dim();
        let mut origin = [0.0; MAX_DIM];
        let mut nb_cells = [0; MAX_DIM];
        for a in 0..dim {
            origin[a] = f64::from(cell_box.lower()[a]) * mesh_size[a];
            nb_cells[a] = cell_box.number_of_cells(a);
        }
        Self::new(dim, interp_order, mesh_size, origin, nb_cells)
    }

    /// Same spacing, origin and order, cell counts taken from `b`.
    pub fn layout_from_box(&self, b: &IndexBox) -> GridLayout {
        let mut out = self.clone();
        for a in 0..self.dim {
            out.nb_cells[a] = b.number_of_cells(a);
        }
        out
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn interp_order(&self) -> u32 {
        self.interp_order
    }

    pub fn mesh_size(&self) -> &[f64] {
        &self.mesh_size[..self.dim]
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin[..self.dim]
    }

    pub fn nb_cells(&self) -> &[u32] {
        &self.nb_cells[..self.dim]
    }

    /// Ghost samples on each side for the given centering.
    pub fn nbr_ghosts(&self, _centering: Centering) -> u32 {
        self.interp_order.div_ceil(2)
    }

    pub fn physical_start_index(&self, qty: HybridQuantity, axis: usize) -> u32 {
        self.nbr_ghosts(qty.centering()[axis])
    }

    pub fn physical_end_index(&self, qty: HybridQuantity, axis: usize) -> u32 {
        let start = self.physical_start_index(qty, axis);
        match qty.centering()[axis] {
            Centering::Primal => start + self.nb_cells[axis],
            Centering::Dual => (start + self.nb_cells[axis]).saturating_sub(1),
        }
    }

    pub fn ghost_start_index(&self, _qty: HybridQuantity, _axis: usize) -> u32 {
        0
    }

    pub fn ghost_end_index(&self, qty: HybridQuantity, axis: usize) -> u32 {
        self.physical_end_index(qty, axis) + self.nbr_ghosts(qty.centering()[axis])
    }
}

/// Turn an AMR cell box into the index box adequate for `qty`.
///
/// Without ghosts the box starts at `cell_box.lower` and spans the physical
/// index range of the quantity; with ghosts the lower corner is shifted left
/// by the ghost width and the box spans the full ghost range. An empty cell
/// box stays empty.
pub fn to_field_box(
    cell_box: &IndexBox,
    qty: HybridQuantity,
    layout: &GridLayout,
    with_ghosts: bool,
) -> IndexBox {
    if cell_box.is_empty() {
        return *cell_box;
    }
    let layout = layout.layout_from_box(cell_box);
    let dim = cell_box.dim();
    let centering = qty.centering();
    let mut lower = cell_box.lower_vect();
    let mut upper = cell_box.upper_vect();
    for a in 0..dim {
        if with_ghosts {
            lower[a] -= layout.nbr_ghosts(centering[a]) as i32;
            let span = layout.ghost_end_index(qty, a) - layout.ghost_start_index(qty, a);
            upper[a] = lower[a] + span as i32;
        } else {
            let span = layout.physical_end_index(qty, a) - layout.physical_start_index(qty, a);
            upper[a] = lower[a] + span as i32;
        }
    }
    IndexBox::from_parts(dim, lower, upper)
}

/// Inverse of [`to_field_box`]: recover the cell box a field box was built from.
pub fn to_cell_box(
    field_box: &IndexBox,
    qty: HybridQuantity,
    layout: &GridLayout,
    with_ghosts: bool,
) -> IndexBox {
    if field_box.is_empty() {
        return *field_box;
    }
    let dim = field_box.dim();
    let centering = qty.centering();
    let mut lower = field_box.lower_vect();
    let mut upper = field_box.upper_vect();
    for a in 0..dim {
        let ghosts = if with_ghosts {
            layout.nbr_ghosts(centering[a]) as i32
        } else {
            0
        };
        lower[a] += ghosts;
        let samples = field_box.number_of_cells(a) as i32 - 2 * ghosts;
        let cells = match centering[a] {
            Centering::Primal => samples - 1,
            Centering::Dual => samples,
        };
        upper[a] = lower[a] + cells - 1;
    }
    IndexBox::from_parts(dim, lower, upper)
}
