//! Error types for the repository watcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::fs::FsError;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The repository directory could not be listed. The watcher has been
    /// deactivated and must be re-enabled explicitly.
    #[error("Repository unavailable at {}: {reason}", path.display())]
    Unavailable { path: PathBuf, reason: String },
}

impl WatchError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: &FsError) -> Self {
        WatchError::Unavailable {
            path: path.into(),
            reason: source.to_string(),
        }
    }
}
