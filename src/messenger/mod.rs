//! Messengers: the level life-cycle of a model on the refinement hierarchy.

pub mod hybrid_messenger;
pub mod info;

pub use hybrid_messenger::{HybridMessenger, MessengerState, StepPhase};
pub use info::{HybridMessengerInfo, VecFieldDescriptor};
