use std::{fs::{self, File}, io::Write, path::{Path, PathBuf}};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Write-then-rename wrapper for atomic outputs.
pub(crate) struct PendingWrite {
    target: PathBuf,
    tmp: NamedTempFile,
}

/// Error if `target` exists and overwriting was not requested.
pub(crate) fn check_overwrite(target: &Path, force: bool) -> Result<()> {
    if !force && target.exists() {
        return Err(Error::write(target, "refusing to overwrite existing file (use --force)"));
    }
    Ok(())
}

/// Open a temp file next to `target`; nothing is visible at `target` until `finish`.
pub(crate) fn open_for_write(target: &Path, force: bool) -> Result<PendingWrite> {
    check_overwrite(target, force)?;
    let parent = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
    let tmp = NamedTempFile::new_in(parent).map_err(|e| Error::write(target, e))?;
    Ok(PendingWrite { target: target.to_path_buf(), tmp })
}

impl PendingWrite {
    pub(crate) fn file_mut(&mut self) -> &mut File { self.tmp.as_file_mut() }

    /// Flush, sync, and rename into place. Dropping without finishing removes the temp file.
    pub(crate) fn finish(mut self) -> Result<()> {
        self.tmp.flush().map_err(|e| Error::write(&self.target, e))?;
        self.tmp.as_file().sync_all().ok(); // best-effort fsync file
        self.tmp.persist(&self.target).map_err(|e| Error::write(&self.target, e.error))?;
        if let Some(dir) = self.target.parent() {
            let _ = File::open(dir).and_then(|f| f.sync_all());
        }
        Ok(())
    }
}
