use geo::{BoundingRect, Centroid, MultiPolygon};
use polars::prelude::*;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use super::NeighborhoodIndex;

/// Neighborhood structure consumed by the dashboard's choropleth layer.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodData {
    pub count: usize,
    /// FeatureCollection whose features are keyed by region id.
    pub geojson: Value,
    pub ids: Vec<String>,
    pub names: Vec<String>,
}

/// Convert a MultiPolygon to GeoJSON coordinates: polygons of rings of [x, y].
fn multipolygon_coords(mp: &MultiPolygon<f64>) -> Value {
    Value::Array(mp.0.iter()
        .map(|polygon| {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| json!([c.x, c.y])).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            json!(rings)
        })
        .collect())
}

impl NeighborhoodData {
    pub fn from_index(index: &NeighborhoodIndex) -> Self {
        let features = index.iter()
            .map(|nbhd| json!({
                "type": "Feature",
                "id": nbhd.region_id,
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": multipolygon_coords(&nbhd.shape),
                },
                "properties": {
                    "regionid": nbhd.region_id,
                    "name": nbhd.name,
                },
            }))
            .collect::<Vec<_>>();

        Self {
            count: index.len(),
            geojson: json!({ "type": "FeatureCollection", "features": features }),
            ids: index.iter().map(|nbhd| nbhd.region_id.clone()).collect(),
            names: index.iter().map(|nbhd| nbhd.name.clone()).collect(),
        }
    }
}

/// Names, bounds and centroids of every neighborhood, in index order.
///
/// Columns: `name, minLon, midLon, maxLon, minLat, midLat, maxLat`.
pub fn neighborhood_info(index: &NeighborhoodIndex) -> Result<DataFrame> {
    let mut names = Vec::with_capacity(index.len());
    let mut bounds: [Vec<f64>; 6] = Default::default();

    for nbhd in index.iter() {
        let rect = nbhd.shape.bounding_rect();
        let centroid = nbhd.shape.centroid();
        names.push(nbhd.name.clone());
        let row = [
            rect.map_or(f64::NAN, |r| r.min().x),
            centroid.map_or(f64::NAN, |p| p.x()),
            rect.map_or(f64::NAN, |r| r.max().x),
            rect.map_or(f64::NAN, |r| r.min().y),
            centroid.map_or(f64::NAN, |p| p.y()),
            rect.map_or(f64::NAN, |r| r.max().y),
        ];
        bounds.iter_mut().zip(row).for_each(|(column, value)| column.push(value));
    }

    let [min_lon, mid_lon, max_lon, min_lat, mid_lat, max_lat] = bounds;
    Ok(DataFrame::new(vec![
        Column::new("name".into(), names),
        Column::new("minLon".into(), min_lon),
        Column::new("midLon".into(), mid_lon),
        Column::new("maxLon".into(), max_lon),
        Column::new("minLat".into(), min_lat),
        Column::new("midLat".into(), mid_lat),
        Column::new("maxLat".into(), max_lat),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn index() -> NeighborhoodIndex {
        NeighborhoodIndex::new(vec![
            ("344008".to_string(), "West Woodland".to_string(), MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0),
            ]])),
            ("250788".to_string(), "Fremont".to_string(), MultiPolygon(vec![polygon![
                (x: 4.0, y: 1.0), (x: 6.0, y: 1.0), (x: 6.0, y: 3.0), (x: 4.0, y: 3.0), (x: 4.0, y: 1.0),
            ]])),
        ])
    }

    #[test]
    fn data_lists_ids_and_names_in_order() {
        let data = NeighborhoodData::from_index(&index());
        assert_eq!(data.count, 2);
        assert_eq!(data.ids, vec!["344008", "250788"]);
        assert_eq!(data.names[0], "West Woodland");

        let features = data.geojson["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1]["id"], "250788");
        assert_eq!(features[1]["properties"]["name"], "Fremont");
        assert_eq!(features[0]["geometry"]["coordinates"][0][0][2], json!([2.0, 2.0]));
    }

    #[test]
    fn info_has_bounds_and_centroids() {
        let df = neighborhood_info(&index()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names_str(), vec!["name", "minLon", "midLon", "maxLon", "minLat", "midLat", "maxLat"]);

        let mid_lon = df.column("midLon").unwrap().f64().unwrap();
        assert_eq!(mid_lon.get(1), Some(5.0));
        let max_lat = df.column("maxLat").unwrap().f64().unwrap();
        assert_eq!(max_lat.get(0), Some(2.0));
    }
}
