use std::path::Path;

use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

use crate::error::{Error, Result};
use super::{open_for_write, PendingWrite};

/// Write a DataFrame as CSV into a pending file for `path`.
pub(crate) fn stage_csv(path: &Path, df: &DataFrame, force: bool) -> Result<PendingWrite> {
    let mut pending = open_for_write(path, force)?;
    CsvWriter::new(pending.file_mut())
        .finish(&mut df.clone())
        .map_err(|e| Error::write(path, e))?;
    Ok(pending)
}
