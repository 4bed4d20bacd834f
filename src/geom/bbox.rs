use geo::Rect;
use rstar::{RTreeObject, AABB};

/// R-tree entry for one neighborhood: its envelope and its index position.
#[derive(Debug, Clone)]
pub(crate) struct BoundingBox {
    pos: usize,
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(crate) fn new(pos: usize, bbox: Rect<f64>) -> Self {
        Self { pos, bbox }
    }

    /// Index position of the neighborhood this box bounds.
    pub(crate) fn pos(&self) -> usize { self.pos }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}
