// End-to-end runs over small shapefile fixtures:
//   loading, reconciliation across id schemes, catalog, flow columns, artifacts

use std::{fs, path::Path};

use polars::prelude::*;
use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    record::EsriShape,
    Point, Polygon, PolygonRing, Polyline, Writer,
};
use tempfile::TempDir;

use trafficflow::{
    pipeline::{self, Inputs},
    read_parquet, Error, PipelineConfig,
};

#[derive(Clone, Copy)]
enum Field { Text(&'static str), Number(&'static str) }

/// Attribute value for one fixture column.
#[derive(Clone)]
enum Value { Text(&'static str), Number(f64), Missing }

fn write_fixture<S: EsriShape>(path: &Path, fields: &[Field], rows: Vec<(S, Vec<Value>)>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let table = fields.iter().fold(TableWriterBuilder::new(), |builder, field| match *field {
        Field::Text(name) => builder.add_character_field(FieldName::try_from(name).unwrap(), 50),
        Field::Number(name) => builder.add_numeric_field(FieldName::try_from(name).unwrap(), 18, 0),
    });
    let mut writer = Writer::from_path(path, table).unwrap();
    for (shape, values) in rows {
        let mut record = Record::default();
        for (field, value) in fields.iter().zip(values) {
            let (name, value) = match (*field, value) {
                (Field::Text(name), Value::Text(s)) => (name, FieldValue::Character(Some(s.to_string()))),
                (Field::Text(name), _) => (name, FieldValue::Character(None)),
                (Field::Number(name), Value::Number(n)) => (name, FieldValue::Numeric(Some(n))),
                (Field::Number(name), _) => (name, FieldValue::Numeric(None)),
            };
            record.insert(name.to_string(), value);
        }
        writer.write_shape_and_record(&shape, &record).unwrap();
    }
}

fn line(points: &[(f64, f64)]) -> Polyline {
    Polyline::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
}

fn square(x0: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(vec![
        Point::new(x0, 0.0), Point::new(x0, 1.0), Point::new(x0 + 1.0, 1.0), Point::new(x0 + 1.0, 0.0), Point::new(x0, 0.0),
    ]))
}

fn config() -> PipelineConfig {
    PipelineConfig { years: vec![2018, 2015, 2010], ..Default::default() }
}

/// Raw directory laid out like the Seattle open-data downloads.
fn raw_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let raw = dir.path();
    let config = config();

    write_fixture(&config.neighborhoods_path(raw), &[Field::Number("regionid"), Field::Text("name")], vec![
        (square(0.0), vec![Value::Number(271.0), Value::Text("Fremont")]),
        (square(1.0), vec![Value::Number(272.0), Value::Text("Wallingford")]),
    ]);

    let streets = [Field::Number("COMPKEY"), Field::Text("STNAME_ORD"), Field::Number("SPEEDLIMIT"), Field::Number("ARTCLASS")];
    write_fixture(&config.streets_path(raw), &streets, vec![
        (line(&[(0.2, 0.5), (0.4, 0.5)]), vec![Value::Number(100.0), Value::Text("N 36TH ST"), Value::Number(25.0), Value::Number(1.0)]),
        (
            Polyline::with_parts(vec![
                vec![Point::new(0.1, 0.1), Point::new(0.2, 0.2)],
                vec![Point::new(1.5, 0.5), Point::new(1.6, 0.6)],
            ]),
            vec![Value::Number(200.0), Value::Text("BROKEN WAY"), Value::Number(30.0), Value::Missing],
        ),
    ]);

    let y2018 = [Field::Number("FLOWSEGID"), Field::Text("COMPKEY"), Field::Text("STNAME_ORD"), Field::Number("AWDT")];
    write_fixture(&config.flow_path(raw, 2018), &y2018, vec![
        (line(&[(0.5, 0.5), (1.5, 0.5)]), vec![Value::Number(42.0), Value::Text("100,101"), Value::Text("N 36TH ST"), Value::Number(5000.0)]),
    ]);

    let y2015 = [Field::Number("FLOWSEGID"), Field::Text("FIRST_STNA"), Field::Number("COUNTAAWDT")];
    write_fixture(&config.flow_path(raw, 2015), &y2015, vec![
        (line(&[(0.5, 0.5), (1.5, 0.5)]), vec![Value::Number(42.0), Value::Text("N 36TH ST"), Value::Number(4800.0)]),
        (line(&[(1.2, 0.2), (1.8, 0.2)]), vec![Value::Missing, Value::Text("STONE WAY N"), Value::Number(700.0)]),
    ]);

    let y2010 = [Field::Number("COMPKEY"), Field::Text("STNAME"), Field::Number("AAWDT")];
    write_fixture(&config.flow_path(raw, 2010), &y2010, vec![
        (line(&[(1.5, 0.8), (1.6, 0.9)]), vec![Value::Number(77.0), Value::Text("WALLINGFORD AVE N"), Value::Number(3000.0)]),
        (line(&[(0.5, 0.5), (1.5, 0.5)]), vec![Value::Number(101.0), Value::Text("N 36TH ST"), Value::Number(4100.0)]),
    ]);

    dir
}

/// Value of an integer column in the row whose key is `key`.
fn cell(df: &DataFrame, key: i64, column: &str) -> i64 {
    let keys = df.column("key").unwrap().i64().unwrap();
    let row = keys.into_no_null_iter().position(|k| k == key).unwrap();
    let values = df.column(column).unwrap().cast(&DataType::Int64).unwrap();
    values.i64().unwrap().get(row).unwrap()
}

fn nbhds(df: &DataFrame, key: i64) -> Vec<u32> {
    let keys = df.column("key").unwrap().i64().unwrap();
    let row = keys.into_no_null_iter().position(|k| k == key).unwrap();
    let cell = df.column("nbhd").unwrap().list().unwrap().get_as_series(row).unwrap();
    cell.u32().unwrap().into_no_null_iter().collect()
}

#[test]
fn prepare_writes_every_artifact() {
    let raw = raw_dir();
    let out = TempDir::new().unwrap();
    let config = config();

    let (index, table) = pipeline::run(Inputs::load(&config, raw.path()).unwrap(), &config.reconcile_options()).unwrap();
    let mut artifacts = pipeline::neighborhood_artifacts(&index).unwrap();
    artifacts.extend(pipeline::street_artifacts(&table, index.len()).unwrap());
    pipeline::write_artifacts(out.path(), &artifacts, false).unwrap();

    for name in [
        pipeline::STREET_DATA_FILE, pipeline::FLOW_CHART_FILE, pipeline::SPEED_CHART_FILE,
        pipeline::NBHD_DATA_FILE, pipeline::NBHD_INFO_FILE,
    ] {
        assert!(out.path().join(name).is_file(), "{name} missing");
    }

    assert_eq!(table.report.catalog.geometry_skipped, 1);
    assert_eq!(table.synthetic_keys.iter().copied().collect::<Vec<_>>(), vec![1_000_000]);

    let df = read_parquet(&out.path().join(pipeline::STREET_DATA_FILE)).unwrap();
    assert_eq!(df.height(), 4);

    assert_eq!(cell(&df, 100, "2018"), 5000);
    assert_eq!(cell(&df, 101, "2018"), 5000);
    assert_eq!(cell(&df, 100, "2015"), 4800);
    assert_eq!(cell(&df, 1_000_000, "2015"), 700);
    assert_eq!(cell(&df, 101, "2010"), 4100);
    assert_eq!(cell(&df, 100, "2010"), 4100);
    assert_eq!(cell(&df, 77, "2010"), 3000);
    assert_eq!(cell(&df, 77, "2018"), -1);
    assert_eq!(cell(&df, 1_000_000, "2010"), -1);

    assert_eq!(cell(&df, 100, "speed"), 25);
    assert_eq!(cell(&df, 100, "road"), 1);
    assert_eq!(cell(&df, 101, "speed"), -1);

    assert_eq!(nbhds(&df, 100), vec![0]);
    assert_eq!(nbhds(&df, 101), vec![0, 1]);
    assert_eq!(nbhds(&df, 77), vec![1]);

    let data: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.path().join(pipeline::NBHD_DATA_FILE)).unwrap(),
    ).unwrap();
    assert_eq!(data["count"], 2);
    assert_eq!(data["ids"], serde_json::json!(["271", "272"]));
    assert_eq!(data["names"], serde_json::json!(["Fremont", "Wallingford"]));

    let info = fs::read_to_string(out.path().join(pipeline::NBHD_INFO_FILE)).unwrap();
    assert_eq!(info.lines().next(), Some("name,minLon,midLon,maxLon,minLat,midLat,maxLat"));
    assert_eq!(info.lines().count(), 3);
}

#[test]
fn missing_yearly_column_aborts_before_any_output() {
    let raw = raw_dir();
    let config = config();
    write_fixture(&config.flow_path(raw.path(), 2010), &[Field::Number("COMPKEY"), Field::Text("STNAME")], vec![
        (line(&[(0.5, 0.5), (0.6, 0.6)]), vec![Value::Number(5.0), Value::Text("A ST")]),
    ]);

    let err = Inputs::load(&config, raw.path()).unwrap_err();
    assert!(matches!(err, Error::Schema { ref column, .. } if column == "AAWDT"), "{err}");
}

#[test]
fn missing_identifier_column_is_a_schema_error() {
    let raw = raw_dir();
    let config = config();
    write_fixture(&config.flow_path(raw.path(), 2018), &[Field::Text("COMPKEY"), Field::Text("STNAME_ORD"), Field::Number("AWDT")], vec![
        (line(&[(0.5, 0.5), (1.5, 0.5)]), vec![Value::Text("100"), Value::Text("N 36TH ST"), Value::Number(5000.0)]),
    ]);

    let err = Inputs::load(&config, raw.path()).unwrap_err();
    assert!(matches!(err, Error::Schema { ref column, .. } if column == "FLOWSEGID"), "{err}");
}

#[test]
fn missing_dataset_is_a_load_error() {
    let raw = raw_dir();
    let config = PipelineConfig { years: vec![2018, 2011], ..Default::default() };
    let err = Inputs::load(&config, raw.path()).unwrap_err();
    assert!(matches!(err, Error::DataLoad { .. }), "{err}");
}

#[test]
fn neighborhoods_load_without_street_data() {
    let raw = raw_dir();
    fs::remove_dir_all(raw.path().join("Seattle_Streets")).unwrap();

    let index = Inputs::load_neighborhoods(&config(), raw.path()).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.get(1).unwrap().name, "Wallingford");
}
