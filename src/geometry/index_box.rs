//! `IndexBox`: integer, axis-aligned boxes in AMR index space.
//!
//! A box is described by inclusive `lower`/`upper` corners in 1, 2 or 3
//! dimensions. Empty boxes are allowed and are encoded with `upper < lower`
//! on at least one axis. Boxes are plain `Copy` values; every operation below
//! is pure.
//!
//! [`BoxContainer`] is an ordered list of boxes used wherever an operation may
//! produce several disjoint pieces (set difference, restriction).
//!
//! Combining boxes of different dimensionality is a programming error and
//! panics.

use crate::amr_error::AmrError;
use crate::debug_invariants::DebugInvariants;
use itertools::Itertools;
use std::fmt;

/// Largest supported dimension.
pub const MAX_DIM: usize = 3;

/// Fixed-capacity integer vector; only the first `dim` entries are meaningful.
pub type IntVect = [i32; MAX_DIM];

/// Integer axis-aligned box with inclusive bounds.
///
/// # Invariants
/// - `1 <= dim <= 3`
/// - entries of `lower`/`upper` beyond `dim` are zero
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct IndexBox {
    dim: usize,
    lower: IntVect,
    upper: IntVect,
}

impl IndexBox {
    /// Build a box from inclusive corners.
    ///
    /// # Panics
    /// Panics if the slices differ in length or the length is not 1, 2 or 3.
    pub fn new(lower: &[i32], upper: &[i32]) -> Self {
        assert_eq!(
            lower.len(),
            upper.len(),
            "IndexBox corners must have the same dimension"
        );
        let dim = lower.len();
        assert!(
            (1..=MAX_DIM).contains(&dim),
            "IndexBox dimension must be 1, 2 or 3 (got {dim})"
        );
        let mut lo = [0; MAX_DIM];
        let mut up = [0; MAX_DIM];
        lo[..dim].copy_from_slice(lower);
        up[..dim].copy_from_slice(upper);
        Self {
            dim,
            lower: lo,
            upper: up,
        }
    }

    /// Build a box directly from fixed-size corners.
    pub(crate) fn from_parts(dim: usize, lower: IntVect, upper: IntVect) -> Self {
        let mut b = Self {
            dim,
            lower,
            upper,
        };
        for axis in dim..MAX_DIM {
            b.lower[axis] = 0;
            b.upper[axis] = 0;
        }
        b
    }

    /// A canonical empty box of the given dimension.
    pub fn empty(dim: usize) -> Self {
        let lower = [0; MAX_DIM];
        let mut upper = [0; MAX_DIM];
        upper[..dim].fill(-1);
        Self::from_parts(dim, lower, upper)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn lower(&self) -> &[i32] {
        &self.lower[..self.dim]
    }

    #[inline]
    pub fn upper(&self) -> &[i32] {
        &self.upper[..self.dim]
    }

    #[inline]
    pub(crate) fn lower_vect(&self) -> IntVect {
        self.lower
    }

    #[inline]
    pub(crate) fn upper_vect(&self) -> IntVect {
        self.upper
    }

    /// True when the box covers no index.
    pub fn is_empty(&self) -> bool {
        (0..self.dim).any(|a| self.upper[a] < self.lower[a])
    }

    /// Number of indices along `axis` (zero when empty along that axis).
    pub fn number_of_cells(&self, axis: usize) -> u32 {
        assert!(axis < self.dim, "axis {axis} out of range for {}-D box", self.dim);
        (self.upper[axis] - self.lower[axis] + 1).max(0) as u32
    }

    /// Total number of indices covered.
    pub fn size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (0..self.dim)
            .map(|a| self.number_of_cells(a) as usize)
            .product()
    }

    fn check_dim(&self, other: &IndexBox) {
        assert_eq!(
            self.dim, other.dim,
            "IndexBox dimensionality mismatch: {} vs {}",
            self.dim, other.dim
        );
    }

    /// Per-axis `max(lower)`, `min(upper)`; empty when disjoint.
    pub fn intersect(&self, other: &IndexBox) -> IndexBox {
        self.check_dim(other);
        let mut out = *self;
        for a in 0..self.dim {
            out.lower[a] = self.lower[a].max(other.lower[a]);
            out.upper[a] = self.upper[a].min(other.upper[a]);
        }
        out
    }

    /// Whether the two boxes share at least one index.
    pub fn intersects(&self, other: &IndexBox) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Whether `other` lies entirely inside `self` (empty boxes are contained everywhere).
    pub fn contains_box(&self, other: &IndexBox) -> bool {
        self.check_dim(other);
        other.is_empty()
            || (0..self.dim)
                .all(|a| self.lower[a] <= other.lower[a] && other.upper[a] <= self.upper[a])
    }

    /// Whether the index `p` (only the first `dim` entries are read) lies in the box.
    pub fn contains(&self, p: &[i32]) -> bool {
        (0..self.dim).all(|a| self.lower[a] <= p[a] && p[a] <= self.upper[a])
    }

    /// Shift both corners by `offset`.
    pub fn translate(&self, offset: &[i32]) -> IndexBox {
        let mut out = *self;
        for a in 0..self.dim {
            out.lower[a] += offset[a];
            out.upper[a] += offset[a];
        }
        out
    }

    /// Grow by `width` on both ends of every axis (negative shrinks).
    pub fn grow(&self, width: i32) -> IndexBox {
        let mut out = *self;
        for a in 0..self.dim {
            out.lower[a] -= width;
            out.upper[a] += width;
        }
        out
    }

    /// Map a cell box to the next finer index space.
    pub fn refine(&self, ratio: i32) -> IndexBox {
        let mut out = *self;
        for a in 0..self.dim {
            out.lower[a] = self.lower[a] * ratio;
            out.upper[a] = (self.upper[a] + 1) * ratio - 1;
        }
        out
    }

    /// Smallest coarse cell box covering this fine cell box.
    pub fn coarsen(&self, ratio: i32) -> IndexBox {
        let mut out = *self;
        for a in 0..self.dim {
            out.lower[a] = self.lower[a].div_euclid(ratio);
            out.upper[a] = self.upper[a].div_euclid(ratio);
        }
        out
    }

    /// Set difference `self \ excluded` as disjoint boxes.
    ///
    /// The pieces are carved axis by axis: below and above the intersection on
    /// axis 0, then on axis 1 inside the remaining slab, and so on.
    pub fn difference(&self, excluded: &IndexBox) -> Vec<IndexBox> {
        if self.is_empty() {
            return Vec::new();
        }
        let inter = self.intersect(excluded);
        if inter.is_empty() {
            return vec![*self];
        }
        let mut pieces = Vec::new();
        let mut rest = *self;
        for a in 0..self.dim {
            if rest.lower[a] < inter.lower[a] {
                let mut below = rest;
                below.upper[a] = inter.lower[a] - 1;
                pieces.push(below);
                rest.lower[a] = inter.lower[a];
            }
            if rest.upper[a] > inter.upper[a] {
                let mut above = rest;
                above.lower[a] = inter.upper[a] + 1;
                pieces.push(above);
                rest.upper[a] = inter.upper[a];
            }
        }
        pieces
    }

    /// Iterate every index of the box, last axis varying fastest.
    pub fn indices(&self) -> impl Iterator<Item = IntVect> + use<> {
        let dim = self.dim;
        let lower = self.lower;
        let ranges: Vec<std::ops::RangeInclusive<i32>> = if self.is_empty() {
            Vec::new()
        } else {
            (0..dim).map(|a| self.lower[a]..=self.upper[a]).collect()
        };
        let empty = ranges.is_empty();
        ranges
            .into_iter()
            .multi_cartesian_product()
            .filter(move |_| !empty)
            .map(move |coords| {
                let mut p = lower;
                p[..dim].copy_from_slice(&coords);
                p
            })
    }

    /// Row-major offset of `p` inside the box (last axis fastest).
    pub(crate) fn linear_offset(&self, p: &[i32]) -> Option<usize> {
        if !self.contains(p) {
            return None;
        }
        let mut off = 0usize;
        for a in 0..self.dim {
            off = off * self.number_of_cells(a) as usize + (p[a] - self.lower[a]) as usize;
        }
        Some(off)
    }
}

impl fmt::Debug for IndexBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}..{:?}]", self.lower(), self.upper())
    }
}

impl fmt::Display for IndexBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ordered collection of boxes.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoxContainer {
    boxes: Vec<IndexBox>,
}

impl BoxContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a box; empty boxes are dropped.
    pub fn push(&mut self, b: IndexBox) {
        if !b.is_empty() {
            self.boxes.push(b);
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexBox> {
        self.boxes.iter()
    }

    pub fn as_slice(&self) -> &[IndexBox] {
        &self.boxes
    }

    /// Push the pieces of `region \ excluded`.
    pub fn remove_intersections_of(&mut self, region: &IndexBox, excluded: &IndexBox) {
        for piece in region.difference(excluded) {
            self.push(piece);
        }
    }

    /// Replace every box overlapping `excluded` by its set difference; boxes
    /// that do not overlap pass through unchanged.
    pub fn remove_intersections(&mut self, excluded: &IndexBox) {
        let old = std::mem::take(&mut self.boxes);
        for b in old {
            if b.intersects(excluded) {
                self.remove_intersections_of(&b, excluded);
            } else {
                self.boxes.push(b);
            }
        }
    }

    /// Remove every box of `excluded` from every box of `self`.
    pub fn remove_all(&mut self, excluded: &BoxContainer) {
        for e in excluded.iter() {
            self.remove_intersections(e);
        }
    }

    /// Keep only the parts of each box that intersect some box of `restrict`.
    pub fn intersect_boxes(&mut self, restrict: &BoxContainer) {
        let old = std::mem::take(&mut self.boxes);
        for b in &old {
            for r in restrict.iter() {
                self.push(b.intersect(r));
            }
        }
    }

    /// Whether any box contains the index `p`.
    pub fn contains(&self, p: &[i32]) -> bool {
        self.boxes.iter().any(|b| b.contains(p))
    }

    /// Sum of box sizes (equal to the covered count when boxes are disjoint).
    pub fn total_size(&self) -> usize {
        self.boxes.iter().map(IndexBox::size).sum()
    }
}

impl FromIterator<IndexBox> for BoxContainer {
    fn from_iter<I: IntoIterator<Item = IndexBox>>(iter: I) -> Self {
        let mut c = BoxContainer::new();
        for b in iter {
            c.push(b);
        }
        c
    }
}

impl IntoIterator for BoxContainer {
    type Item = IndexBox;
    type IntoIter = std::vec::IntoIter<IndexBox>;
    fn into_iter(self) -> Self::IntoIter {
        self.boxes.into_iter()
    }
}

impl<'a> IntoIterator for &'a BoxContainer {
    type Item = &'a IndexBox;
    type IntoIter = std::slice::Iter<'a, IndexBox>;
    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

impl DebugInvariants for BoxContainer {
    fn validate_invariants(&self) -> Result<(), AmrError> {
        let Some(first) = self.boxes.first() else {
            return Ok(());
        };
        for b in &self.boxes {
            if b.dim() != first.dim() {
                return Err(AmrError::DimensionMismatch {
                    expected: first.dim(),
                    found: b.dim(),
                });
            }
            if b.is_empty() {
                return Err(AmrError::InvariantViolation(format!(
                    "container holds empty box {b}"
                )));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = IndexBox::new(&[0, 0], &[4, 4]);
        let b = IndexBox::new(&[5, 0], &[9, 4]);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(a.intersect(&b).size(), 0);
    }

    #[test]
    fn number_of_cells_and_size() {
        let b = IndexBox::new(&[-1, 2, 0], &[3, 2, 1]);
        assert_eq!(b.number_of_cells(0), 5);
        assert_eq!(b.number_of_cells(1), 1);
        assert_eq!(b.number_of_cells(2), 2);
        assert_eq!(b.size(), 10);
        assert_eq!(IndexBox::empty(2).size(), 0);
    }

    #[test]
    #[should_panic(expected = "dimensionality mismatch")]
    fn mixed_dimensions_panic() {
        let a = IndexBox::new(&[0], &[4]);
        let b = IndexBox::new(&[0, 0], &[4, 4]);
        let _ = a.intersect(&b);
    }

    #[test]
    fn difference_of_centered_hole_has_four_pieces_in_2d() {
        let outer = IndexBox::new(&[0, 0], &[9, 9]);
        let hole = IndexBox::new(&[3, 3], &[5, 5]);
        let pieces = outer.difference(&hole);
        assert_eq!(pieces.len(), 4);
        let covered: usize = pieces.iter().map(IndexBox::size).sum();
        assert_eq!(covered, 100 - 9);
        for p in &pieces {
            assert!(!p.intersects(&hole));
        }
    }

    #[test]
    fn container_rejects_mixed_dimensions() {
        let ok: BoxContainer = [IndexBox::new(&[0], &[1]), IndexBox::empty(1)]
            .into_iter()
            .collect();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok.validate_invariants(), Ok(()));
        let mixed: BoxContainer = [IndexBox::new(&[0], &[1]), IndexBox::new(&[0, 0], &[1, 1])]
            .into_iter()
            .collect();
        assert_eq!(
            mixed.validate_invariants(),
            Err(AmrError::DimensionMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn remove_intersections_passes_disjoint_boxes_through() {
        let mut c: BoxContainer = [IndexBox::new(&[0], &[3]), IndexBox::new(&[10], &[12])]
            .into_iter()
            .collect();
        c.remove_intersections(&IndexBox::new(&[2], &[5]));
        assert_eq!(
            c.as_slice(),
            &[IndexBox::new(&[0], &[1]), IndexBox::new(&[10], &[12])]
        );
    }

    #[test]
    fn refine_then_coarsen_recovers_box() {
        let b = IndexBox::new(&[-2, 3], &[4, 7]);
        assert_eq!(b.refine(2), IndexBox::new(&[-4, 6], &[9, 15]));
        assert_eq!(b.refine(2).coarsen(2), b);
    }

    #[test]
    fn indices_visit_every_point_once() {
        let b = IndexBox::new(&[0, 1], &[2, 2]);
        let pts: Vec<_> = b.indices().collect();
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], [0, 1, 0]);
        assert_eq!(pts[1], [0, 2, 0]);
        assert_eq!(b.linear_offset(&[2, 2]), Some(5));
        assert_eq!(IndexBox::empty(2).indices().count(), 0);
    }
}
