use std::path::Path;

use shapefile::{dbase, dbase::Record, Reader, Shape};

use crate::error::{Error, Result};

/// Reads all shapes + attribute records from a given `.shp` file path.
///
/// The `.dbf` header must declare every column in `required`; otherwise this fails with
/// a schema error naming `dataset`, even when the file holds no records.
/// The reader (and its `.shp`/`.dbf` handles) is dropped before returning.
pub(crate) fn read_shapefile(path: &Path, dataset: &str, required: &[&str]) -> Result<Vec<(Shape, Record)>> {
    if !path.is_file() {
        return Err(Error::data_load(path, "file does not exist"));
    }

    let columns = read_columns(path)?;
    if let Some(column) = required.iter().find(|&&column| !columns.iter().any(|c| c == column)) {
        return Err(Error::schema(format!("{dataset} ({})", path.display()), column));
    }

    let mut reader = Reader::from_path(path)
        .map_err(|e| Error::data_load(path, e))?;

    let mut items = Vec::with_capacity(reader.shape_count().unwrap_or(0));
    for result in reader.iter_shapes_and_records() {
        items.push(result.map_err(|e| Error::data_load(path, e))?);
    }
    Ok(items)
}

/// Column names declared in the `.dbf` header next to `path`.
fn read_columns(path: &Path) -> Result<Vec<String>> {
    let dbf = path.with_extension("dbf");
    let reader = dbase::Reader::from_path(&dbf)
        .map_err(|e| Error::data_load(&dbf, e))?;
    Ok(reader.fields().iter().map(|field| field.name().to_string()).collect())
}
