//! Box transformations: periodic wrap (translation) and axis reflection.
//!
//! A [`Transformation`] maps source indices into destination indices. On a
//! plain axis a cell index `c` maps to `c + offset`; on a flipped axis the
//! cell `c` maps to `offset - c`, so a flipped transformation is its own
//! inverse on that axis.
//!
//! Node-centered indices and continuous positions follow the cell mapping:
//! on a flipped axis node `n` (left face of cell `n`) maps to `offset + 1 - n`
//! and a position `x` (in cell units) maps to `offset + 1 - x`.

use crate::geometry::index_box::{IndexBox, IntVect, MAX_DIM};
use crate::geometry::layout::Centering;

/// Invertible integer transformation of index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Transformation {
    dim: usize,
    offset: IntVect,
    flip: [bool; MAX_DIM],
}

impl Transformation {
    /// The identity map in `dim` dimensions.
    pub fn identity(dim: usize) -> Self {
        Self {
            dim,
            offset: [0; MAX_DIM],
            flip: [false; MAX_DIM],
        }
    }

    /// Pure translation by `offset`.
    pub fn translation(offset: &[i32]) -> Self {
        let mut t = Self::identity(offset.len());
        t.offset[..offset.len()].copy_from_slice(offset);
        t
    }

    /// Translation combined with per-axis reflections.
    pub fn with_flips(offset: &[i32], flips: &[bool]) -> Self {
        assert_eq!(offset.len(), flips.len(), "offset/flip dimension mismatch");
        let mut t = Self::translation(offset);
        t.flip[..flips.len()].copy_from_slice(flips);
        t
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn offset(&self) -> &[i32] {
        &self.offset[..self.dim]
    }

    pub fn is_identity(&self) -> bool {
        self.offset.iter().all(|&o| o == 0) && self.flip.iter().all(|&f| !f)
    }

    /// The transformation undoing `self`.
    pub fn inverse(&self) -> Self {
        let mut inv = *self;
        for a in 0..self.dim {
            if !self.flip[a] {
                inv.offset[a] = -self.offset[a];
            }
        }
        inv
    }

    /// Map a cell box.
    pub fn apply_box(&self, b: &IndexBox) -> IndexBox {
        assert_eq!(self.dim, b.dim(), "transformation/box dimension mismatch");
        let (lo, up) = (b.lower_vect(), b.upper_vect());
        let mut lower = lo;
        let mut upper = up;
        for a in 0..self.dim {
            if self.flip[a] {
                lower[a] = self.offset[a] - up[a];
                upper[a] = self.offset[a] - lo[a];
            } else {
                lower[a] = lo[a] + self.offset[a];
                upper[a] = up[a] + self.offset[a];
            }
        }
        IndexBox::from_parts(self.dim, lower, upper)
    }

    /// Map a field index with the given per-axis centering.
    pub fn apply_index(&self, p: &IntVect, centering: &[Centering; MAX_DIM]) -> IntVect {
        let mut out = *p;
        for a in 0..self.dim {
            out[a] = if self.flip[a] {
                match centering[a] {
                    Centering::Dual => self.offset[a] - p[a],
                    Centering::Primal => self.offset[a] + 1 - p[a],
                }
            } else {
                p[a] + self.offset[a]
            };
        }
        out
    }

    /// Map a continuous position expressed in cell units.
    pub fn apply_position(&self, x: &[f64; MAX_DIM]) -> [f64; MAX_DIM] {
        let mut out = *x;
        for a in 0..self.dim {
            out[a] = if self.flip[a] {
                f64::from(self.offset[a]) + 1.0 - x[a]
            } else {
                x[a] + f64::from(self.offset[a])
            };
        }
        out
    }

    /// Map a velocity (reflected axes change sign).
    pub fn apply_velocity(&self, v: &[f64; 3]) -> [f64; 3] {
        let mut out = *v;
        for a in 0..self.dim {
            if self.flip[a] {
                out[a] = -v[a];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_round_trips_through_inverse() {
        let t = Transformation::translation(&[10, -3]);
        let b = IndexBox::new(&[0, 0], &[4, 2]);
        let moved = t.apply_box(&b);
        assert_eq!(moved, IndexBox::new(&[10, -3], &[14, -1]));
        assert_eq!(t.inverse().apply_box(&moved), b);
    }

    #[test]
    fn flip_is_an_involution_on_boxes() {
        let t = Transformation::with_flips(&[9], &[true]);
        let b = IndexBox::new(&[0], &[3]);
        let moved = t.apply_box(&b);
        assert_eq!(moved, IndexBox::new(&[6], &[9]));
        assert_eq!(t.inverse().apply_box(&moved), b);
    }

    #[test]
    fn flipped_nodes_follow_flipped_cells() {
        let t = Transformation::with_flips(&[9], &[true]);
        let c = [Centering::Primal; MAX_DIM];
        // node 0 is the left face of cell 0, which lands on cell 9: its right face is node 10
        assert_eq!(t.apply_index(&[0, 0, 0], &c)[0], 10);
        assert!((t.apply_position(&[0.25, 0.0, 0.0])[0] - 9.75).abs() < 1e-12);
        assert_eq!(t.apply_velocity(&[1.0, 2.0, 3.0]), [-1.0, 2.0, 3.0]);
    }
}
