use std::path::Path;

use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point, Rect};
use rstar::{RTree, AABB};
use shapefile::Shape;

use crate::{common, error::{Error, Result}, geom::{rings_to_multipolygon, BoundingBox}};

/// Position of a neighborhood in the index, as written to the `nbhd` column.
pub type NeighborhoodIdx = u32;

/// One neighborhood boundary.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub idx: NeighborhoodIdx,
    pub region_id: String,
    pub name: String,
    pub shape: MultiPolygon<f64>,
}

/// Which attribute columns hold the neighborhood id and display name.
#[derive(Debug, Clone, Copy)]
pub struct NeighborhoodFields<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

/// Ordered list of neighborhood polygons with an R-tree over their bounding boxes.
///
/// Iteration order is the order of the source records and is the order in which
/// containment queries report neighborhoods.
#[derive(Debug, Clone)]
pub struct NeighborhoodIndex {
    entries: Vec<Neighborhood>,
    rtree: RTree<BoundingBox>,
}

impl NeighborhoodIndex {
    /// Build an index from (region id, name, shape) triples, numbered in order.
    pub fn new(items: impl IntoIterator<Item = (String, String, MultiPolygon<f64>)>) -> Self {
        let entries = items.into_iter().enumerate()
            .map(|(i, (region_id, name, shape))| Neighborhood { idx: i as NeighborhoodIdx, region_id, name, shape })
            .collect::<Vec<_>>();
        Self {
            rtree: RTree::bulk_load(
                entries.iter().enumerate()
                    .filter_map(|(pos, entry)| entry.shape.bounding_rect().map(|rect| BoundingBox::new(pos, rect)))
                    .collect()
            ),
            entries,
        }
    }

    /// Load neighborhood boundaries from a `.shp` file.
    /// Every record must carry a polygon; any other shape aborts the load.
    /// The id and name columns must be declared in the attribute table.
    pub fn from_shapefile(path: &Path, fields: NeighborhoodFields) -> Result<Self> {
        let items = common::read_shapefile(path, "neighborhoods", &[fields.id, fields.name])?;

        let neighborhoods = items.into_iter().enumerate()
            .map(|(i, (shape, record))| {
                let shape = match shape {
                    Shape::Polygon(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y)),
                    Shape::PolygonM(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y)),
                    Shape::PolygonZ(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y)),
                    other => return Err(Error::data_load(path,
                        format!("record {i}: expected a polygon, found {:?}", other.shapetype()))),
                };
                if shape.0.is_empty() {
                    return Err(Error::data_load(path, format!("record {i}: polygon has no rings")));
                }
                let text = |column: &str| record.get(column)
                    .and_then(|value| match value {
                        shapefile::dbase::FieldValue::Character(s) => s.as_ref().map(|s| s.trim().to_string()),
                        shapefile::dbase::FieldValue::Numeric(n) => n.map(|n| n.to_string()),
                        _ => None,
                    })
                    .unwrap_or_default();
                Ok((text(fields.id), text(fields.name), shape))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(neighborhoods = neighborhoods.len(), path = %path.display(), "loaded neighborhood polygons");
        Ok(Self::new(neighborhoods))
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Neighborhood> { self.entries.iter() }

    pub fn get(&self, idx: NeighborhoodIdx) -> Option<&Neighborhood> { self.entries.get(idx as usize) }

    /// Neighborhoods containing at least one of the given (lon, lat) points, in index order.
    pub fn neighborhoods_containing(&self, points: &[Coord<f64>]) -> Vec<NeighborhoodIdx> {
        let Some(envelope) = envelope(points) else { return Vec::new() };

        let mut candidates = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(BoundingBox::pos)
            .collect::<Vec<_>>();
        candidates.sort_unstable();

        candidates.into_iter()
            .map(|pos| &self.entries[pos])
            .filter(|entry| points.iter().any(|&c| entry.shape.contains(&Point::from(c))))
            .map(|entry| entry.idx)
            .collect()
    }
}

/// Bounding envelope of a point list.
fn envelope(points: &[Coord<f64>]) -> Option<AABB<[f64; 2]>> {
    let first = *points.first()?;
    let rect = points.iter().fold(Rect::new(first, first), |rect, &c| Rect::new(
        Coord { x: rect.min().x.min(c.x), y: rect.min().y.min(c.y) },
        Coord { x: rect.max().x.max(c.x), y: rect.max().y.max(c.y) },
    ));
    Some(AABB::from_corners(rect.min().into(), rect.max().into()))
}
