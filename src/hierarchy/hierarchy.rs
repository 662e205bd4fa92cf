//! The patch hierarchy as seen by the messenger.
//!
//! The messenger never builds or reshapes the hierarchy; it only iterates the
//! patches of a level and reads level metadata. [`PatchHierarchy`] is that
//! read-only contract, [`BasicHierarchy`] an in-memory implementation.

use crate::amr_error::AmrError;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::index_box::{IndexBox, MAX_DIM};
use crate::hierarchy::patch::{Patch, PatchId, PatchLevel};

/// Read-only access to the levels of an AMR hierarchy.
pub trait PatchHierarchy {
    fn number_of_levels(&self) -> usize;

    fn level_of(&self, number: usize) -> Option<&PatchLevel>;

    /// Patches of level `number`, empty if the level does not exist.
    fn patches_of(&self, number: usize) -> &[Patch] {
        self.level_of(number).map(PatchLevel::patches).unwrap_or(&[])
    }

    /// Like [`level_of`](Self::level_of) but failing with `MissingLevel`.
    fn try_level(&self, number: usize) -> Result<&PatchLevel, AmrError> {
        self.level_of(number)
            .ok_or(AmrError::MissingLevel { level: number })
    }
}

/// Hierarchy kept entirely in memory.
///
/// Local patch ids are unique over the lifetime of the hierarchy, so patches
/// of a replaced level never collide with the patches replacing them.
#[derive(Clone, Debug, Default)]
pub struct BasicHierarchy {
    levels: Vec<PatchLevel>,
    next_local: usize,
}

impl BasicHierarchy {
    /// Create a hierarchy with a single root level.
    pub fn with_root(
        domain: IndexBox,
        boxes: &[IndexBox],
        mesh_size: [f64; MAX_DIM],
        periodic: [bool; MAX_DIM],
    ) -> Result<Self, AmrError> {
        let mut h = Self::default();
        let patches = h.make_patches(0, boxes, domain.dim(), mesh_size)?;
        let root = PatchLevel::new(0, patches, 1, domain, periodic, mesh_size);
        root.debug_assert_invariants();
        h.levels.push(root);
        Ok(h)
    }

    /// Append a finer level; `boxes` are expressed in the new level's index space.
    pub fn add_level(&mut self, ratio: i32, boxes: &[IndexBox]) -> Result<usize, AmrError> {
        if ratio < 2 {
            return Err(AmrError::InvalidConfig(format!(
                "refinement ratio must be at least 2, got {ratio}"
            )));
        }
        let coarser = self
            .levels
            .last()
            .ok_or(AmrError::MissingLevel { level: 0 })?;
        let number = coarser.number() + 1;
        let domain = coarser.domain().refine(ratio);
        let periodic = coarser.periodic();
        let mut mesh_size = coarser.mesh_size();
        for h in &mut mesh_size {
            *h /= f64::from(ratio);
        }
        let patches = self.make_patches(number, boxes, domain.dim(), mesh_size)?;
        let level = PatchLevel::new(number, patches, ratio, domain, periodic, mesh_size);
        level.debug_assert_invariants();
        self.levels.push(level);
        Ok(number)
    }

    /// Replace the boxes of an existing level and hand back the old level.
    pub fn replace_level(
        &mut self,
        number: usize,
        boxes: &[IndexBox],
    ) -> Result<PatchLevel, AmrError> {
        let old = self.try_level(number)?.clone();
        let patches = self.make_patches(number, boxes, old.dim(), old.mesh_size())?;
        self.levels[number] = PatchLevel::new(
            number,
            patches,
            old.ratio_to_coarser(),
            *old.domain(),
            old.periodic(),
            old.mesh_size(),
        );
        self.levels[number].debug_assert_invariants();
        Ok(old)
    }

    fn make_patches(
        &mut self,
        level: usize,
        boxes: &[IndexBox],
        dim: usize,
        mesh_size: [f64; MAX_DIM],
    ) -> Result<Vec<Patch>, AmrError> {
        boxes
            .iter()
            .map(|b| {
                if b.dim() != dim {
                    return Err(AmrError::DimensionMismatch {
                        expected: dim,
                        found: b.dim(),
                    });
                }
                let id = PatchId::new(level, self.next_local);
                self.next_local += 1;
                Ok(Patch::new(id, *b, mesh_size))
            })
            .collect()
    }
}

impl PatchHierarchy for BasicHierarchy {
    fn number_of_levels(&self) -> usize {
        self.levels.len()
    }

    fn level_of(&self, number: usize) -> Option<&PatchLevel> {
        self.levels.get(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> BasicHierarchy {
        let domain = IndexBox::new(&[0], &[9]);
        BasicHierarchy::with_root(
            domain,
            &[IndexBox::new(&[0], &[4]), IndexBox::new(&[5], &[9])],
            [0.1; 3],
            [true, false, false],
        )
        .unwrap()
    }

    #[test]
    fn finer_level_refines_domain_and_spacing() {
        let mut h = root();
        let n = h.add_level(2, &[IndexBox::new(&[4], &[11])]).unwrap();
        assert_eq!(n, 1);
        let l1 = h.level_of(1).unwrap();
        assert_eq!(*l1.domain(), IndexBox::new(&[0], &[19]));
        assert!((l1.mesh_size()[0] - 0.05).abs() < 1e-15);
        assert_eq!(l1.ratio_to_coarser(), 2);
        assert_eq!(h.patches_of(1).len(), 1);
        assert!(h.patches_of(7).is_empty());
    }

    #[test]
    fn replaced_level_gets_fresh_ids() {
        let mut h = root();
        h.add_level(2, &[IndexBox::new(&[4], &[11])]).unwrap();
        let old = h.replace_level(1, &[IndexBox::new(&[6], &[13])]).unwrap();
        let old_id = old.patches()[0].id();
        let new_id = h.patches_of(1)[0].id();
        assert_ne!(old_id, new_id);
        assert_eq!(new_id.level, 1);
    }

    #[test]
    fn bad_ratio_and_missing_level() {
        let mut h = root();
        assert!(matches!(
            h.add_level(1, &[]),
            Err(AmrError::InvalidConfig(_))
        ));
        assert_eq!(
            h.replace_level(3, &[]).unwrap_err(),
            AmrError::MissingLevel { level: 3 }
        );
    }
}
