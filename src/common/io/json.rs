use std::{io::{BufWriter, Write}, path::Path};

use serde::Serialize;

use crate::error::{Error, Result};
use super::{open_for_write, PendingWrite};

/// Serialize `value` as JSON into a pending file for `path`.
pub(crate) fn stage_json<T: Serialize>(path: &Path, value: &T, force: bool) -> Result<PendingWrite> {
    let mut pending = open_for_write(path, force)?;
    {
        let mut writer = BufWriter::new(pending.file_mut());
        serde_json::to_writer(&mut writer, value).map_err(|e| Error::write(path, e))?;
        writer.flush().map_err(|e| Error::write(path, e))?;
    }
    Ok(pending)
}
