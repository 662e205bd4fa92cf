//! Internal consistency checks for boxes, levels and fields.
//!
//! Checks run in debug builds, or in release builds with the
//! `check-invariants` feature, at the points where a structure is built or
//! handed back to its owner (new levels, fields returned to a patch).

use crate::amr_error::AmrError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), AmrError>;

    /// Panic on a violated invariant when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = self.validate_invariants() {
            panic!("[invariants] {} invalid: {e}", std::any::type_name::<Self>());
        }
    }
}
