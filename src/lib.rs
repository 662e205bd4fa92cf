#![cfg_attr(docsrs, feature(doc_cfg))]
//! # hybrid-messenger
//!
//! hybrid-messenger is the ghost-synchronization engine of a hybrid
//! kinetic/fluid plasma model running on a hierarchy of adaptively refined,
//! structured grids. Finer levels sub-cycle in time, so coarse data must be
//! refined, time-interpolated and injected into finer levels each sub-cycle,
//! and fine data coarsened back once the levels meet again.
//!
//! ## Features
//! - Integer box algebra with periodic and coarse/fine transformations
//! - Yee-lattice quantity layouts mapping cell boxes onto field index boxes
//! - Exact overlap computation between field or particle patch geometries
//! - Communicators and refine schedules for field ghosts, field
//!   initialization, particle splitting and patch-ghost particle exchange
//! - A messenger driving the level life-cycle (register, init, regrid,
//!   sub-cycle steps, synchronization)
//! - Optional Rayon parallelism inside schedule execution
//!
//! ## Determinism
//!
//! Particle loading uses `SmallRng` seeds taken from the initializer
//! description, and schedules apply their writes in a fixed order, so runs
//! are reproducible with or without the `rayon` feature.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! hybrid-messenger = "0.3"
//! # features = ["rayon"]
//! ```
//!
//! The hierarchy is consumed through the [`hierarchy::PatchHierarchy`]
//! trait; [`hierarchy::BasicHierarchy`] is an in-memory implementation.

pub mod algs;
pub mod amr_error;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod hierarchy;
pub mod messenger;
pub mod overlap;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{
        CommunicationRole, Communicator, RefineOperator, TransferDescriptor,
    };
    pub use crate::algs::schedule::Schedule;
    pub use crate::algs::split::{SplitPattern, SplitRole};
    pub use crate::amr_error::AmrError;
    pub use crate::config::AmrConfig;
    pub use crate::data::electromag::Electromag;
    pub use crate::data::field::Field;
    pub use crate::data::hybrid_state::{HybridModel, HybridState};
    pub use crate::data::ion_population::{IonPopulation, ParticleSet};
    pub use crate::data::ions::Ions;
    pub use crate::data::particle_initializer::{Basis, InitializerInfo};
    pub use crate::data::particles::{Particle, ParticleArray};
    pub use crate::data::vecfield::VecField;
    pub use crate::geometry::field_geometry::{OverlapRequest, PatchGeometry, calculate_overlap};
    pub use crate::geometry::index_box::{BoxContainer, IndexBox};
    pub use crate::geometry::layout::{GridLayout, HybridQuantity, to_field_box};
    pub use crate::geometry::transform::Transformation;
    pub use crate::hierarchy::hierarchy::{BasicHierarchy, PatchHierarchy};
    pub use crate::hierarchy::patch::{Patch, PatchId, PatchLevel};
    pub use crate::hierarchy::resources::{ResourcesManager, ResourcesUser};
    pub use crate::messenger::hybrid_messenger::{HybridMessenger, MessengerState, StepPhase};
    pub use crate::messenger::info::{HybridMessengerInfo, VecFieldDescriptor};
    pub use crate::overlap::overlap::BoxOverlap;
}
