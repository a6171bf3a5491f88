use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::repair;

/// Removes an uploaded file and its repaired sibling when dropped, so every
/// exit path of a run cleans up. Removal failures are logged, never raised.
pub struct UploadGuard {
    paths: Vec<PathBuf>,
}

impl UploadGuard {
    pub fn new(upload: &Path) -> Self {
        Self {
            paths: vec![upload.to_path_buf(), repair::repaired_path(upload)],
        }
    }

    /// Removes only the repaired sibling, leaving the caller's file in place.
    pub fn repaired_copy(input: &Path) -> Self {
        Self {
            paths: vec![repair::repaired_path(input)],
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match remove_if_exists(path) {
                Ok(true) => tracing::debug!(path = %path.display(), "removed temporary file"),
                Ok(false) => {}
                Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to remove temporary file"),
            }
        }
    }
}

/// `Ok(false)` when there was nothing to remove.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
