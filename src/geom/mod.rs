mod bbox;
mod polygon;
mod polyline;

pub(crate) use bbox::BoundingBox;
pub(crate) use polygon::rings_to_multipolygon;
pub(crate) use polyline::resolve_polyline;
