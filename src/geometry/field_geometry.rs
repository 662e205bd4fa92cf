//! Patch geometries and overlap computation.
//!
//! A [`PatchGeometry`] describes how one patch stores one kind of data:
//! a field of a given quantity ([`FieldGeometry`]) or particles
//! ([`ParticleGeometry`]). [`calculate_overlap`] intersects a source and a
//! destination geometry under a transformation and returns the destination
//! boxes a transfer must write.
//!
//! Geometries are only comparable when their [`GeometryKind`] tags are equal.
//! When they are not, the computation is retried once with the two
//! geometries swapped; if that also fails the overlap is empty, meaning
//! "nothing to transfer".

use crate::geometry::index_box::{BoxContainer, IndexBox};
use crate::geometry::layout::{GridLayout, HybridQuantity, to_field_box};
use crate::geometry::transform::Transformation;
use crate::overlap::overlap::BoxOverlap;

/// Explicit tag standing in for "same concrete geometry type".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Field { dim: usize },
    Particles { dim: usize },
}

/// A cell box, its layout and the quantity stored on it.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldGeometry {
    cell_box: IndexBox,
    layout: GridLayout,
    quantity: HybridQuantity,
}

impl FieldGeometry {
    pub fn new(cell_box: IndexBox, layout: GridLayout, quantity: HybridQuantity) -> Self {
        Self {
            cell_box,
            layout,
            quantity,
        }
    }

    pub fn cell_box(&self) -> &IndexBox {
        &self.cell_box
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn quantity(&self) -> HybridQuantity {
        self.quantity
    }

    /// Field box of the quantity on this geometry.
    pub fn field_box(&self, with_ghosts: bool) -> IndexBox {
        to_field_box(&self.cell_box, self.quantity, &self.layout, with_ghosts)
    }

    /// Normalize declared cell boxes into field space and pair them with
    /// `transformation`, without any intersection logic.
    pub fn set_up_overlap(&self, boxes: &BoxContainer, transformation: Transformation) -> BoxOverlap {
        let destination: BoxContainer = boxes
            .iter()
            .map(|b| to_field_box(b, self.quantity, &self.layout, false))
            .collect();
        BoxOverlap::new(destination, transformation)
    }

    fn destination_boxes(&self, source: &FieldGeometry, request: &OverlapRequest<'_>) -> BoxContainer {
        // source mask restricts the source box, then the transformation carries it
        // into destination index space (periodic shift, reflection)
        let source_shift = request
            .transformation
            .apply_box(&source.cell_box.intersect(&request.source_mask));

        let qty = self.quantity;
        let destination_field = to_field_box(&self.cell_box, qty, &self.layout, true);
        let source_field = to_field_box(&source_shift, qty, &source.layout, false);
        let fill_field = to_field_box(&request.fill_box, qty, &self.layout, true);

        let together = destination_field
            .intersect(&source_field)
            .intersect(&fill_field);

        let mut boxes = BoxContainer::new();
        if !together.is_empty() {
            if request.overwrite_interior {
                boxes.push(together);
            } else {
                let interior = to_field_box(&self.cell_box, qty, &self.layout, false);
                boxes.remove_intersections_of(&together, &interior);
            }
        }

        if !request.restrict_boxes.is_empty() && !boxes.is_empty() {
            let restrict: BoxContainer = request
                .restrict_boxes
                .iter()
                .map(|b| to_field_box(b, qty, &self.layout, true))
                .collect();
            boxes.intersect_boxes(&restrict);
        }
        boxes
    }
}

/// Particle storage on a patch: interior cells plus a ghost layer of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticleGeometry {
    cell_box: IndexBox,
    ghost_width: i32,
}

impl ParticleGeometry {
    pub fn new(cell_box: IndexBox, ghost_width: u32) -> Self {
        Self {
            cell_box,
            ghost_width: ghost_width as i32,
        }
    }

    pub fn cell_box(&self) -> &IndexBox {
        &self.cell_box
    }

    pub fn ghost_box(&self) -> IndexBox {
        self.cell_box.grow(self.ghost_width)
    }

    fn destination_boxes(&self, source: &ParticleGeometry, request: &OverlapRequest<'_>) -> BoxContainer {
        let source_shift = request
            .transformation
            .apply_box(&source.cell_box.intersect(&request.source_mask));
        let fill = request.fill_box.grow(self.ghost_width);
        let together = self.ghost_box().intersect(&source_shift).intersect(&fill);

        let mut boxes = BoxContainer::new();
        if !together.is_empty() {
            if request.overwrite_interior {
                boxes.push(together);
            } else {
                boxes.remove_intersections_of(&together, &self.cell_box);
            }
        }
        if !request.restrict_boxes.is_empty() && !boxes.is_empty() {
            boxes.intersect_boxes(request.restrict_boxes);
        }
        boxes
    }
}

/// Closed set of geometry kinds a patch datum may have.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchGeometry {
    Field(FieldGeometry),
    Particles(ParticleGeometry),
}

impl PatchGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            PatchGeometry::Field(g) => GeometryKind::Field {
                dim: g.cell_box.dim(),
            },
            PatchGeometry::Particles(g) => GeometryKind::Particles {
                dim: g.cell_box.dim(),
            },
        }
    }
}

/// Everything that parametrizes one overlap computation besides the two geometries.
#[derive(Clone, Debug)]
pub struct OverlapRequest<'a> {
    /// Region of the source patch allowed to contribute.
    pub source_mask: IndexBox,
    /// Region of the destination patch to fill (cell box, ghosts added per quantity).
    pub fill_box: IndexBox,
    /// When false, the destination interior is carved out of the result.
    pub overwrite_interior: bool,
    /// Source → destination index mapping.
    pub transformation: Transformation,
    /// When non-empty, only the parts of the result touching these cell boxes survive.
    pub restrict_boxes: &'a BoxContainer,
}

/// Compute the overlap between `destination` and `source`.
///
/// Kinds must match (same variant, same dimension). Otherwise, with
/// `allow_retry` set, the call is repeated with the two geometries swapped and
/// retry disabled; if it still does not match the overlap is empty.
pub fn calculate_overlap(
    destination: &PatchGeometry,
    source: &PatchGeometry,
    request: &OverlapRequest<'_>,
    allow_retry: bool,
) -> BoxOverlap {
    if destination.kind() != source.kind() {
        if allow_retry {
            return calculate_overlap(source, destination, request, false);
        }
        log::trace!(
            "no compatible transfer between {:?} and {:?}",
            destination.kind(),
            source.kind()
        );
        return BoxOverlap::empty(request.transformation);
    }
    let boxes = match (destination, source) {
        (PatchGeometry::Field(d), PatchGeometry::Field(s)) => d.destination_boxes(s, request),
        (PatchGeometry::Particles(d), PatchGeometry::Particles(s)) => d.destination_boxes(s, request),
        _ => BoxContainer::new(),
    };
    BoxOverlap::new(boxes, request.transformation)
}
