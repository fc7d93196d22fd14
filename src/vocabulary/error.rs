//! Error types for the vocabulary store.

use std::path::PathBuf;

use thiserror::Error;

use super::VocabularyField;

/// Errors from vocabulary catalog operations.
#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error(
        "Cannot remove {field} key '{key}': referenced by {count} document(s); rename them first"
    )]
    RemovalBlocked {
        field: VocabularyField,
        key: String,
        count: usize,
    },

    #[error("Invalid {field} key '{key}': {reason}")]
    InvalidKey {
        field: VocabularyField,
        key: String,
        reason: String,
    },

    #[error("Unknown {field} key '{key}'")]
    UnknownKey { field: VocabularyField, key: String },

    #[error("Unknown vocabulary field: {0}")]
    UnknownField(String),

    #[error("Failed to save catalog {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load catalog {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for vocabulary operations.
pub type VocabularyResult<T> = Result<T, VocabularyError>;
