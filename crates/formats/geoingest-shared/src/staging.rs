//! Per-call temporary directory for readers that need files on disk.
//!
//! Some formats can only be opened from a path (shapefile bundles, `SQLite`
//! containers). A [`StagingArea`] owns a fresh temporary directory for the
//! duration of one read; it is removed when the area is dropped, on every
//! exit path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{SpatialFormatReadError, SpatialFormatResult};

/// Temporary directory scoped to one processing call.
#[derive(Debug)]
pub struct StagingArea {
    dir: Option<TempDir>,
}

impl StagingArea {
    /// Creates a new, empty staging directory whose name starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new(prefix: &str) -> SpatialFormatResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|err| SpatialFormatReadError::io(err, "temporary staging directory"))?;
        log::debug!("Created staging directory {}", dir.path().display());
        Ok(Self { dir: Some(dir) })
    }

    /// Root of the staging directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.as_ref().map_or(Path::new(""), TempDir::path)
    }

    /// Writes `bytes` to `file_name` inside the staging directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written or `file_name`
    /// would escape the staging directory.
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> SpatialFormatResult<PathBuf> {
        let name = Path::new(file_name);
        if name.components().count() != 1 || name.file_name().is_none() {
            return Err(SpatialFormatReadError::io(
                io::Error::new(io::ErrorKind::InvalidInput, "invalid staged file name"),
                file_name.to_string(),
            ));
        }
        let path = self.path().join(name);
        fs::write(&path, bytes)
            .map_err(|err| SpatialFormatReadError::io(err, path.display().to_string()))?;
        Ok(path)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => log::debug!("Removed staging directory {}", path.display()),
                Err(err) => log::warn!(
                    "Failed to remove staging directory {}: {err}",
                    path.display()
                ),
            }
        }
    }
}
