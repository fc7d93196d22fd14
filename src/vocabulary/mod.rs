//! Vocabulary store: per-field catalogs of legal metadata values.
//!
//! This module provides:
//! - [`VocabularyField`], the categorical axes encoded in filenames
//! - [`Catalog`], an ordered, case-insensitive key → description map
//! - [`VocabularyStore`], the persisted available/used catalogs with
//!   referential-integrity guarded removals

mod catalog;
mod defaults;
mod error;
mod field;
mod store;

pub use catalog::Catalog;
pub use error::{VocabularyError, VocabularyResult};
pub use field::VocabularyField;
pub use store::{KeyReferences, KeyStatus, VocabularyEvent, VocabularyStore};
