//! Patches, levels and the buffers allocated on them.

pub mod hierarchy;
pub mod patch;
pub mod resources;

pub use hierarchy::{BasicHierarchy, PatchHierarchy};
pub use patch::{Patch, PatchId, PatchLevel};
pub use resources::{ResourceName, ResourcesManager, ResourcesUser};
