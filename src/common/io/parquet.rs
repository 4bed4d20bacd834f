use std::{fs::File, path::Path};

use polars::{frame::DataFrame, io::SerReader, prelude::{ParquetReader, ParquetWriter}};

use crate::error::{Error, Result};
use super::{open_for_write, PendingWrite};

/// Write a DataFrame as Parquet into a pending file for `path`.
pub(crate) fn stage_parquet(path: &Path, df: &DataFrame, force: bool) -> Result<PendingWrite> {
    let mut pending = open_for_write(path, force)?;
    ParquetWriter::new(pending.file_mut())
        .finish(&mut df.clone())
        .map_err(|e| Error::write(path, e))?;
    Ok(pending)
}

/// Reads a Polars DataFrame from a Parquet file at `path`.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| Error::data_load(path, e))?;
    ParquetReader::new(file).finish().map_err(|e| Error::data_load(path, e))
}
