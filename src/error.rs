//! Crate-level errors for repository operations.
//!
//! Component errors ([`FsError`], [`VocabularyError`], [`WatchError`]) are
//! wrapped transparently so callers see the original message.

use std::path::PathBuf;

use thiserror::Error;

use crate::fs::FsError;
use crate::index::FilterError;
use crate::vocabulary::VocabularyError;
use crate::watcher::WatchError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Invalid document name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Repository format {found} is newer than supported format {supported}")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error("Invalid repository marker {}: {reason}", path.display())]
    Marker { path: PathBuf, reason: String },

    #[error("Failed to write description cache {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepositoryError {
    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        RepositoryError::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
