//! `BoxOverlap`: destination boxes plus the source→destination transformation.
use crate::debug_invariants::DebugInvariants;
use crate::geometry::index_box::{BoxContainer, IndexBox};
use crate::geometry::transform::Transformation;

/// Ordered set of destination boxes and the transformation mapping source data into them.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoxOverlap {
    destination_boxes: BoxContainer,
    transformation: Transformation,
}

impl BoxOverlap {
    pub fn new(destination_boxes: BoxContainer, transformation: Transformation) -> Self {
        destination_boxes.debug_assert_invariants();
        Self {
            destination_boxes,
            transformation,
        }
    }

    /// An overlap with no destination box: nothing to transfer.
    pub fn empty(transformation: Transformation) -> Self {
        Self::new(BoxContainer::new(), transformation)
    }

    pub fn destination_boxes(&self) -> &BoxContainer {
        &self.destination_boxes
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    pub fn is_empty(&self) -> bool {
        self.destination_boxes.is_empty()
    }

    /// Iterate every destination index covered by the overlap.
    pub fn destination_indices(&self) -> impl Iterator<Item = [i32; 3]> + '_ {
        self.destination_boxes.iter().flat_map(IndexBox::indices)
    }

    /// Total number of destination indices.
    pub fn size(&self) -> usize {
        self.destination_boxes.total_size()
    }
}
