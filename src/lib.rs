//! docname: documents whose metadata lives entirely in their filenames.
//!
//! A repository is a directory of files named
//! `YYYYMMDD-COUNTRY-GROUP-SENTBY-PURPOSE-concept_text-SENTTO.ext` plus a
//! `.conf/` metadata directory holding per-field vocabulary catalogs.
//!
//! - [`codec`] encodes, decodes and repairs filenames
//! - [`vocabulary`] stores the legal values of every field
//! - [`watcher`] polls the directory for changes
//! - [`index`] keeps the decoded document collection and answers queries
//! - [`repository`] ties them together and emits [`events`]

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod fs;
pub mod index;
pub mod logging;
pub mod repository;
pub mod utils;
pub mod vocabulary;
pub mod watcher;

pub use codec::{CodecError, DecodedFields};
pub use config::Settings;
pub use error::{RepositoryError, RepositoryResult};
pub use events::{EventBus, RepositoryEvent};
pub use fs::{Filesystem, LocalFilesystem};
pub use index::{DateFilter, Document, DocumentFilter, DocumentIndex, FilterState, FnFilter, Selector};
pub use repository::Repository;
pub use vocabulary::{VocabularyError, VocabularyField, VocabularyStore};
pub use watcher::{ChangeSet, RepositoryWatcher, WatchError};
