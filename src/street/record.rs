use std::path::Path;

use geo::{Coord, LineString, MultiLineString};
use shapefile::{dbase::{FieldValue, Record}, Shape};

use crate::{common, error::{GeometryError, Result, ValueParseError}};
use super::{keys::{CompKey, KeyList}, scheme::{self, DatasetSchema, IdScheme}};

/// An attribute value as read from the source table, parsed lazily by each stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawField {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl RawField {
    fn from_field_value(value: &FieldValue) -> Self {
        match value {
            FieldValue::Character(Some(s)) | FieldValue::Memo(s) => Self::Text(s.trim().to_string()),
            FieldValue::Character(None) => Self::Null,
            FieldValue::Numeric(n) => n.map_or(Self::Null, Self::Number),
            FieldValue::Float(n) => n.map_or(Self::Null, |n| Self::Number(n as f64)),
            FieldValue::Integer(n) => Self::Number(*n as f64),
            FieldValue::Double(n) | FieldValue::Currency(n) => Self::Number(*n),
            other => Self::Text(format!("{other:?}")),
        }
    }

    /// Parse as an integer, truncating fractional values. Missing and NaN values are `None`.
    pub fn as_int(&self, field: &'static str) -> std::result::Result<Option<i64>, ValueParseError> {
        let invalid = || ValueParseError { field, value: self.to_string() };
        match self {
            Self::Null => Ok(None),
            Self::Number(n) if n.is_nan() => Ok(None),
            Self::Number(n) if n.is_finite() => Ok(Some(n.trunc() as i64)),
            Self::Number(_) => Err(invalid()),
            Self::Text(s) if s.trim().is_empty() => Ok(None),
            Self::Text(s) => s.trim().parse::<i64>().ok()
                .or_else(|| s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
                .map(Some)
                .ok_or_else(invalid),
        }
    }

    /// Parse as a list of CompKeys. Missing values are `None`.
    pub fn as_keys(&self) -> std::result::Result<Option<KeyList>, ValueParseError> {
        let invalid = || ValueParseError { field: scheme::COMPKEY, value: self.to_string() };
        match self {
            Self::Null => Ok(None),
            Self::Number(n) if n.is_nan() => Ok(None),
            Self::Number(n) => super::keys::parse_key(&n.to_string())
                .map(|key| Some(KeyList::single(key)))
                .ok_or_else(invalid),
            Self::Text(s) if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("none") => Ok(None),
            Self::Text(s) => s.trim().parse::<KeyList>().map(Some).map_err(|_| invalid()),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl std::fmt::Display for RawField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self { Self::Number(value) }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self { Self::Text(value.to_string()) }
}

/// One street record from a canonical or yearly dataset.
#[derive(Debug, Clone)]
pub struct StreetRecord {
    pub comp_key: RawField,
    pub flow_seg_id: RawField,
    pub name: Option<String>,
    pub geometry: std::result::Result<MultiLineString<f64>, GeometryError>,
    pub flow: RawField,
    pub speed: RawField,
    pub arterial: RawField,
}

impl StreetRecord {
    /// A record with the given polyline parts and no attributes.
    pub fn new(parts: Vec<Vec<(f64, f64)>>) -> Self {
        Self {
            comp_key: RawField::Null,
            flow_seg_id: RawField::Null,
            name: None,
            geometry: Ok(MultiLineString(parts.into_iter()
                .map(|part| LineString(part.into_iter().map(|(x, y)| Coord { x, y }).collect()))
                .collect())),
            flow: RawField::Null,
            speed: RawField::Null,
            arterial: RawField::Null,
        }
    }

    pub fn with_keys(mut self, keys: impl Into<RawField>) -> Self { self.comp_key = keys.into(); self }

    pub fn with_flow_seg_id(mut self, id: impl Into<RawField>) -> Self { self.flow_seg_id = id.into(); self }

    pub fn with_name(mut self, name: &str) -> Self { self.name = Some(name.to_string()); self }

    pub fn with_flow(mut self, flow: impl Into<RawField>) -> Self { self.flow = flow.into(); self }

    pub fn with_speed(mut self, speed: impl Into<RawField>) -> Self { self.speed = speed.into(); self }

    pub fn with_arterial(mut self, class: impl Into<RawField>) -> Self { self.arterial = class.into(); self }

    pub fn with_geometry_error(mut self, err: GeometryError) -> Self { self.geometry = Err(err); self }
}

/// Convert a shapefile shape into polyline parts.
fn shape_to_parts(shape: Shape) -> std::result::Result<MultiLineString<f64>, GeometryError> {
    /// Collect (x, y) of each part into a LineString
    fn parts<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> (f64, f64)) -> MultiLineString<f64> {
        MultiLineString(parts.iter()
            .map(|part| LineString(part.iter().map(|p| { let (x, y) = xy(p); Coord { x, y } }).collect()))
            .collect())
    }

    match shape {
        Shape::Polyline(line) => Ok(parts(line.parts(), |p| (p.x, p.y))),
        Shape::PolylineM(line) => Ok(parts(line.parts(), |p| (p.x, p.y))),
        Shape::PolylineZ(line) => Ok(parts(line.parts(), |p| (p.x, p.y))),
        Shape::NullShape => Err(GeometryError::Empty),
        Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => Err(GeometryError::NotLinear("point")),
        Shape::Multipoint(_) | Shape::MultipointM(_) | Shape::MultipointZ(_) => Err(GeometryError::NotLinear("multipoint")),
        Shape::Polygon(_) | Shape::PolygonM(_) | Shape::PolygonZ(_) => Err(GeometryError::NotLinear("polygon")),
        Shape::Multipatch(_) => Err(GeometryError::NotLinear("multipatch")),
    }
}

/// All records of one dataset, tagged with the schema they were read under.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: DatasetSchema,
    pub records: Vec<StreetRecord>,
}

impl Dataset {
    pub fn new(schema: DatasetSchema, records: Vec<StreetRecord>) -> Self {
        Self { schema, records }
    }

    /// Load a dataset from a `.shp` file using the given schema.
    /// Fails if the file cannot be read or its header lacks a required column.
    pub fn from_shapefile(path: &Path, schema: DatasetSchema) -> Result<Self> {
        let items = common::read_shapefile(path, &schema.kind.to_string(), &schema.required_columns())?;

        /// Get a field from a Record, or Null if the column is absent
        fn field(record: &Record, column: &str) -> RawField {
            record.get(column).map_or(RawField::Null, RawField::from_field_value)
        }

        let records = items.into_iter()
            .map(|(shape, record)| StreetRecord {
                comp_key: match schema.ids {
                    IdScheme::FlowOnly => RawField::Null,
                    _ => field(&record, scheme::COMPKEY),
                },
                flow_seg_id: match schema.ids {
                    IdScheme::KeysOnly => RawField::Null,
                    _ => field(&record, scheme::FLOWSEGID),
                },
                name: field(&record, schema.name_column).as_text(),
                geometry: shape_to_parts(shape),
                flow: schema.flow_column.map_or(RawField::Null, |column| field(&record, column)),
                speed: field(&record, scheme::SPEEDLIMIT),
                arterial: field(&record, scheme::ARTCLASS),
            })
            .collect::<Vec<_>>();

        tracing::info!(dataset = %schema.kind, records = records.len(), path = %path.display(), "loaded dataset");
        Ok(Self { schema, records })
    }

    /// Real CompKeys listed by this dataset's records.
    pub fn real_keys(&self) -> impl Iterator<Item = CompKey> + '_ {
        let has_keys = self.schema.ids != IdScheme::FlowOnly;
        self.records.iter()
            .filter(move |_| has_keys)
            .filter_map(|record| record.comp_key.as_keys().ok().flatten())
            .flat_map(|keys| keys.iter().collect::<Vec<_>>())
    }
}
