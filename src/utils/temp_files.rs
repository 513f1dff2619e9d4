//! Best-effort tracking and removal of intermediate download files

use std::path::{Path, PathBuf};
use tracing::debug;

/// Remove every path, ignoring failures (missing files included)
pub fn cleanup(paths: &[PathBuf]) {
    for path in paths {
        if std::fs::remove_file(path).is_ok() {
            debug!("Removed temporary file {}", path.display());
        }
    }
}

/// Temporary files created during a merge run
///
/// Files are removed by [`TempFileSet::cleanup`] or, if the run aborts early,
/// when the set is dropped.
#[derive(Debug, Default)]
pub struct TempFileSet {
    paths: Vec<PathBuf>,
}

impl TempFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track<P: Into<PathBuf>>(&mut self, path: P) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn cleanup(mut self) {
        cleanup(&std::mem::take(&mut self.paths));
    }
}

impl Drop for TempFileSet {
    fn drop(&mut self) {
        if !self.paths.is_empty() {
            cleanup(&self.paths);
        }
    }
}
