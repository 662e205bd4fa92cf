//! Transfer algorithms: field operators, particle splitting, interpolation
//! and the schedules and communicators that drive them.

pub mod coarsen;
pub mod communicator;
pub mod interpolate;
pub mod refine;
pub mod schedule;
pub mod split;

pub use communicator::{CommunicationRole, Communicator, RefineOperator, TransferDescriptor};
pub use schedule::Schedule;
pub use split::{SplitPattern, SplitRole};
