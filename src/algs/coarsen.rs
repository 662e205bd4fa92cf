//! Fine → coarse field operator used by level synchronization.
//!
//! Along a primal axis the coarse node coincides with fine node `r·i` and is
//! injected; along a dual axis the coarse cell covers fine cells
//! `r·i ..= r·i + r − 1` and receives their average.

use crate::data::field::Field;
use crate::geometry::index_box::{IndexBox, MAX_DIM};
use crate::geometry::layout::Centering;

/// Coarsened value at coarse index `p`, or `None` if a needed fine sample is missing.
pub fn coarsen_value(fine: &Field, p: &[i32], ratio: i32) -> Option<f64> {
    let dim = fine.index_box().dim();
    let centering = fine.quantity().centering();
    let mut lower = [0; MAX_DIM];
    let mut upper = [0; MAX_DIM];
    for a in 0..dim {
        lower[a] = p[a] * ratio;
        upper[a] = match centering[a] {
            Centering::Primal => lower[a],
            Centering::Dual => lower[a] + ratio - 1,
        };
    }
    let stencil = IndexBox::new(&lower[..dim], &upper[..dim]);
    let mut sum = 0.0;
    for q in stencil.indices() {
        sum += fine.get(&q)?;
    }
    Some(sum / stencil.size() as f64)
}

/// Coarse cells entirely covered by `fine_cells`.
pub fn covered_coarse_cells(fine_cells: &IndexBox, ratio: i32) -> IndexBox {
    let dim = fine_cells.dim();
    let mut lower = [0; MAX_DIM];
    let mut upper = [0; MAX_DIM];
    for a in 0..dim {
        lower[a] = fine_cells.lower()[a].div_euclid(ratio)
            + i32::from(fine_cells.lower()[a].rem_euclid(ratio) != 0);
        upper[a] = (fine_cells.upper()[a] + 1).div_euclid(ratio) - 1;
    }
    IndexBox::new(&lower[..dim], &upper[..dim])
}
