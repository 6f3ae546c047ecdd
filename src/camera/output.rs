//! Recording output destinations.

use std::path::{Path, PathBuf};

/// Destination for one recording.
///
/// Deliberately not `Clone`: a target is moved into the backend when the
/// recording starts and cannot be reused for a second one.
#[derive(Debug, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
}

impl OutputTarget {
    /// A target writing to `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A target writing `name` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self::file(dir.as_ref().join(name))
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the target, returning its path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}
