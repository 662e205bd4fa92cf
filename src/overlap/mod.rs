//! Overlap module: the result of intersecting a source and a destination
//! patch geometry.
//!
//! An overlap records *where* a transfer writes (destination boxes, in the
//! destination quantity's index space) and *how* source indices map onto them
//! (a [`Transformation`](crate::geometry::transform::Transformation)).
//! Overlaps are computed fresh for each transfer request and never cached.

pub mod overlap;
