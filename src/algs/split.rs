//! Particle splitting: one coarse particle becomes `k` fine particles.
//!
//! The coarse position is first expressed in fine cell units (multiplied by
//! the refinement ratio), then each child is offset by the pattern's
//! displacement along every axis. Children share the parent's charge and
//! velocity; their weights sum to the parent's weight.

use crate::amr_error::AmrError;
use crate::data::particles::{Particle, ParticleArray};
use crate::geometry::index_box::MAX_DIM;

/// Which coarse set feeds which fine set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SplitRole {
    /// Coarse domain → fine domain, on new or regridded levels.
    Interior,
    /// Coarse domain before the coarse push → fine level-ghost-old.
    CoarseBoundaryOld,
    /// Coarse domain after the coarse push → fine level-ghost-new.
    CoarseBoundaryNew,
}

/// Displacement of binary children, in fine cell units.
pub const BINARY_DELTA: f64 = 0.551569;

/// Geometric split pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SplitPattern {
    /// Two children at `±δ` on every axis, half weight each.
    Binary,
    /// Children at `0` (half weight) and `±δ` (quarter weight each).
    Ternary,
}

impl SplitPattern {
    pub fn from_name(name: &str) -> Result<Self, AmrError> {
        match name {
            "binary" => Ok(SplitPattern::Binary),
            "ternary" => Ok(SplitPattern::Ternary),
            other => Err(AmrError::UnknownSplitPattern(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SplitPattern::Binary => "binary",
            SplitPattern::Ternary => "ternary",
        }
    }

    /// Number of fine particles produced per coarse particle.
    pub fn nbr_refined_part(self) -> usize {
        match self {
            SplitPattern::Binary => 2,
            SplitPattern::Ternary => 3,
        }
    }

    fn children(self) -> &'static [(f64, f64)] {
        const BINARY: [(f64, f64); 2] = [(-BINARY_DELTA, 0.5), (BINARY_DELTA, 0.5)];
        const TERNARY: [(f64, f64); 3] =
            [(-BINARY_DELTA, 0.25), (0.0, 0.5), (BINARY_DELTA, 0.25)];
        match self {
            SplitPattern::Binary => &BINARY,
            SplitPattern::Ternary => &TERNARY,
        }
    }

    /// Append the children of `coarse` to `out`.
    pub fn split(self, coarse: &Particle, ratio: i32, dim: usize, out: &mut ParticleArray) {
        let mut x = coarse.position();
        for xa in x.iter_mut().take(dim) {
            *xa *= f64::from(ratio);
        }
        for &(offset, fraction) in self.children() {
            let mut xc = x;
            for xa in xc.iter_mut().take(dim) {
                *xa += offset;
            }
            let mut child =
                Particle::at_position(coarse.weight * fraction, coarse.charge, xc, coarse.v);
            child.i_cell[dim..MAX_DIM].copy_from_slice(&coarse.i_cell[dim..MAX_DIM]);
            child.delta[dim..MAX_DIM].copy_from_slice(&coarse.delta[dim..MAX_DIM]);
            out.push(child);
        }
    }
}
