//! Index-space geometry: boxes, transformations, quantity layouts and the
//! patch geometries overlaps are computed from.

pub mod field_geometry;
pub mod index_box;
pub mod layout;
pub mod transform;

pub use field_geometry::{
    FieldGeometry, GeometryKind, OverlapRequest, ParticleGeometry, PatchGeometry,
    calculate_overlap,
};
pub use index_box::{BoxContainer, IndexBox};
pub use layout::{Centering, GridLayout, HybridQuantity, to_field_box};
pub use transform::Transformation;
