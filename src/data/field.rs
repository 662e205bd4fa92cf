//! Field: dense `f64` samples of one quantity over a patch's ghost field box.
//!
//! Indices are global AMR field indices of the patch's level (the same index
//! space [`to_field_box`](crate::geometry::layout::to_field_box) produces), so
//! two fields of the same quantity on the same level can be compared index by
//! index without any offset bookkeeping.

use crate::amr_error::AmrError;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::index_box::{IndexBox, IntVect};
use crate::geometry::layout::HybridQuantity;

/// Storage for one scalar quantity on one patch.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    name: String,
    quantity: HybridQuantity,
    ghost_box: IndexBox,
    data: Vec<f64>,
}

impl Field {
    /// Zero-initialized field covering `ghost_box`.
    pub fn new(name: impl Into<String>, quantity: HybridQuantity, ghost_box: IndexBox) -> Self {
        Self {
            name: name.into(),
            quantity,
            data: vec![0.0; ghost_box.size()],
            ghost_box,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> HybridQuantity {
        self.quantity
    }

    /// The ghost field box this field stores.
    pub fn index_box(&self) -> &IndexBox {
        &self.ghost_box
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, p: &[i32]) -> Option<f64> {
        self.ghost_box.linear_offset(p).map(|i| self.data[i])
    }

    /// Overwrite the sample at `p`. Writes outside the ghost box are dropped.
    #[inline]
    pub fn set(&mut self, p: &[i32], value: f64) {
        if let Some(i) = self.ghost_box.linear_offset(p) {
            self.data[i] = value;
        }
    }

    /// Accumulate into the sample at `p`. Writes outside the ghost box are dropped.
    #[inline]
    pub fn add(&mut self, p: &[i32], value: f64) {
        if let Some(i) = self.ghost_box.linear_offset(p) {
            self.data[i] += value;
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Copy every sample of `other` lying inside this field's box.
    pub fn copy_from(&mut self, other: &Field) {
        if other.ghost_box == self.ghost_box {
            self.data.copy_from_slice(&other.data);
            return;
        }
        let common = self.ghost_box.intersect(&other.ghost_box);
        for p in common.indices() {
            if let Some(v) = other.get(&p) {
                self.set(&p, v);
            }
        }
    }

    /// Iterate `(index, value)` over the whole ghost box.
    pub fn iter(&self) -> impl Iterator<Item = (IntVect, f64)> + '_ {
        self.ghost_box.indices().zip(self.data.iter().copied())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl DebugInvariants for Field {
    fn validate_invariants(&self) -> Result<(), AmrError> {
        if self.data.len() != self.ghost_box.size() {
            return Err(AmrError::InvariantViolation(format!(
                "field `{}` holds {} samples for box {} of size {}",
                self.name,
                self.data.len(),
                self.ghost_box,
                self.ghost_box.size()
            )));
        }
        Ok(())
    }
}
