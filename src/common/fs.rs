use std::{fs, path::Path};

use crate::error::{Error, Result};

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::write(path, "path exists but is not a directory"));
        }
    } else {
        fs::create_dir_all(path).map_err(|e| Error::write(path, e))?;
    }
    Ok(())
}

/// Error unless the directory already exists.
pub(crate) fn require_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() { return Err(Error::data_load(path, "directory does not exist")) }
    if !path.is_dir() { return Err(Error::data_load(path, "path exists but is not a directory")) }
    Ok(())
}
