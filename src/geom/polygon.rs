use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile as shp;

/// Convert shapefile polygon rings to geo::MultiPolygon<f64>.
///
/// Shapefiles store each exterior ring (clockwise) followed by its holes
/// (counter-clockwise); explicit ring tags are used when the reader provides them.
/// A hole listed before any exterior ring belongs to no polygon and is dropped.
pub(crate) fn rings_to_multipolygon<P>(rings: &[shp::PolygonRing<P>], xy: impl Fn(&P) -> (f64, f64)) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<Coord<f64>>) {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
    }

    let mut polys = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes = Vec::new();

    for ring in rings {
        let mut coords = ring.points().iter()
            .map(|p| { let (x, y) = xy(p); Coord { x, y } })
            .collect::<Vec<_>>();
        ensure_closed(&mut coords);
        match ring {
            shp::PolygonRing::Outer(_) => {
                // flush previous polygon
                if let Some(ext) = current_exterior.take() {
                    polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
                }
                current_exterior = Some(LineString(coords));
            }
            shp::PolygonRing::Inner(_) if current_exterior.is_some() => current_holes.push(LineString(coords)),
            shp::PolygonRing::Inner(_) => tracing::debug!(points = coords.len(), "dropping hole with no enclosing ring"),
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Point};

    fn pt(x: f64, y: f64) -> shp::Point { shp::Point { x, y } }

    #[test]
    fn outer_with_hole() {
        let rings = vec![
            shp::PolygonRing::Outer(vec![pt(0.0, 0.0), pt(0.0, 4.0), pt(4.0, 4.0), pt(4.0, 0.0)]),
            shp::PolygonRing::Inner(vec![pt(1.0, 1.0), pt(3.0, 1.0), pt(3.0, 3.0), pt(1.0, 3.0), pt(1.0, 1.0)]),
        ];
        let mp = rings_to_multipolygon(&rings, |p| (p.x, p.y));
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!((mp.unsigned_area() - 12.0).abs() < 1e-9);
        assert!(mp.contains(&Point::new(0.5, 0.5)));
        assert!(!mp.contains(&Point::new(2.0, 2.0)));
    }

    #[test]
    fn two_outers_make_two_polygons() {
        let square = |x0: f64| vec![pt(x0, 0.0), pt(x0, 1.0), pt(x0 + 1.0, 1.0), pt(x0 + 1.0, 0.0), pt(x0, 0.0)];
        let rings = vec![shp::PolygonRing::Outer(square(0.0)), shp::PolygonRing::Outer(square(5.0))];
        let mp = rings_to_multipolygon(&rings, |p| (p.x, p.y));
        assert_eq!(mp.0.len(), 2);
        assert!(mp.contains(&Point::new(5.5, 0.5)));
    }

    #[test]
    fn leading_hole_is_dropped() {
        let rings = vec![
            shp::PolygonRing::Inner(vec![pt(1.0, 1.0), pt(3.0, 1.0), pt(3.0, 3.0), pt(1.0, 3.0), pt(1.0, 1.0)]),
            shp::PolygonRing::Outer(vec![pt(0.0, 0.0), pt(0.0, 4.0), pt(4.0, 4.0), pt(4.0, 0.0), pt(0.0, 0.0)]),
        ];
        let mp = rings_to_multipolygon(&rings, |p| (p.x, p.y));
        assert_eq!(mp.0.len(), 1);
        assert!(mp.0[0].interiors().is_empty());
        assert!(mp.contains(&Point::new(2.0, 2.0)));
    }
}
