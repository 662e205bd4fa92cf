//! AmrError: unified error type for hybrid-messenger public APIs.
//!
//! Geometry mismatches are not errors (they produce an empty overlap); every
//! other failure mode of the messenger, the resources manager and the
//! factories is reported through this enum so the caller can decide whether
//! to abort the run.

use thiserror::Error;

use crate::hierarchy::patch::PatchId;

/// Unified error type for hybrid-messenger operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AmrError {
    /// A per-level operation was invoked before `register_level` for that level.
    #[error("Sequencing error: level {level} was not registered with the messenger")]
    LevelNotRegistered { level: usize },
    /// `register_level` was called before `register_quantities`.
    #[error("Sequencing error: quantities must be registered before any level")]
    QuantitiesNotRegistered,
    /// Time interpolation asked for with a zero-length coarse interval.
    #[error(
        "Sequencing error: degenerate coarse time interval [{before}, {after}] \
         (first_step not called, or root level used for level-ghost interpolation)"
    )]
    DegenerateCoarseInterval { before: f64, after: f64 },
    /// A root-only operation was invoked on a refined level.
    #[error("Sequencing error: operation requires the root level, got level {level}")]
    NotRootLevel { level: usize },
    /// The hierarchy does not contain the requested level.
    #[error("Hierarchy has no level {level}")]
    MissingLevel { level: usize },
    /// An operation needing a coarser level was invoked on the root.
    #[error("Level {level} has no coarser level")]
    MissingCoarserLevel { level: usize },

    /// A resource was accessed while not set on a patch.
    #[error("Resource `{name}` is not usable (not set on a patch)")]
    ResourceNotUsable { name: String },
    /// A resource name was never registered with the resources manager.
    #[error("Resource `{name}` is not registered")]
    UnknownResource { name: String },
    /// A patch has no storage in the resources manager.
    #[error("Patch {patch} has no allocated resources")]
    PatchNotAllocated { patch: PatchId },
    /// The patch buffers are already lent out to another resource user.
    #[error("Resource `{name}` on patch {patch} is already lent to another user")]
    ResourceOnLoan { name: String, patch: PatchId },

    /// Particle initializer name not recognized by the factory.
    #[error("Configuration error: unknown particle initializer `{0}`")]
    UnknownInitializer(String),
    /// Split pattern name not recognized.
    #[error("Configuration error: unknown split pattern `{0}`")]
    UnknownSplitPattern(String),
    /// Interpolation order outside 1..=3.
    #[error("Configuration error: unsupported interpolation order {0}")]
    UnsupportedInterpOrder(u32),
    /// Dimension outside 1..=3.
    #[error("Configuration error: invalid dimension {0}")]
    InvalidDimension(usize),
    /// Any other out-of-range configuration value.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
    /// A required key was missing from an initializer description.
    #[error("Configuration error: missing key `{0}`")]
    MissingKey(String),

    /// A communicator was asked to fill a quantity it never registered.
    #[error("Quantity `{0}` is not registered with this communicator")]
    UnknownQuantity(String),
    /// A data structure failed its internal consistency check.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    /// Two objects of different dimensionality were combined.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}
