//! Cache of human-readable descriptions derived from raw field values.
//!
//! Entries are grouped by scope (`date` or a vocabulary field name) and keyed
//! by the raw value. A vocabulary notification drops the whole scope of the
//! affected field. The cache is persisted next to the catalogs so a restart
//! does not recompute everything.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::utils::write_atomic;
use crate::vocabulary::{VocabularyField, VocabularyStore};

pub const DESCRIPTIONS_FILE: &str = "descriptions.json";

const DATE_SCOPE: &str = "date";
const UNDATED: &str = "undated";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDescriptions {
    version: u32,
    scopes: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct DescriptionCache {
    scopes: BTreeMap<String, BTreeMap<String, String>>,
    dirty: bool,
}

impl DescriptionCache {
    const VERSION: u32 = 1;

    /// Load a persisted cache. A missing or unreadable file yields an empty cache.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("[index] ignoring unreadable description cache {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<PersistedDescriptions>(&content) {
            Ok(state) if state.version == Self::VERSION => Self {
                scopes: state.scopes,
                dirty: false,
            },
            Ok(state) => {
                crate::debug_event!("index", "cache version mismatch", "{}", state.version);
                Self {
                    scopes: BTreeMap::new(),
                    dirty: true,
                }
            }
            Err(e) => {
                tracing::warn!("[index] discarding corrupt description cache {}: {e}", path.display());
                Self {
                    scopes: BTreeMap::new(),
                    dirty: true,
                }
            }
        }
    }

    /// Write the cache if it changed since the last load or save.
    pub fn save(&mut self, path: &Path) -> std::io::Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let state = PersistedDescriptions {
            version: Self::VERSION,
            scopes: self.scopes.clone(),
        };
        let content = serde_json::to_string_pretty(&state).map_err(std::io::Error::other)?;
        write_atomic(path, content.as_bytes())?;
        self.dirty = false;
        Ok(())
    }

    fn get_or_insert_with(&mut self, scope: &str, raw: &str, describe: impl FnOnce() -> String) -> String {
        if let Some(cached) = self.scopes.get(scope).and_then(|entries| entries.get(raw)) {
            return cached.clone();
        }

        let description = describe();
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(raw.to_string(), description.clone());
        self.dirty = true;
        description
    }

    /// `20240105` → `5 Jan 2024`; unparsable dates become `undated`.
    pub fn describe_date(&mut self, raw: &str) -> String {
        self.get_or_insert_with(DATE_SCOPE, raw, || match codec::parse_date(raw) {
            Ok(date) => date.format("%-d %b %Y").to_string(),
            Err(_) => UNDATED.to_string(),
        })
    }

    /// Catalog description of a key, or the key itself when it is unknown.
    pub fn describe(&mut self, field: VocabularyField, key: &str, vocabulary: &VocabularyStore) -> String {
        self.get_or_insert_with(field.name(), key, || {
            vocabulary
                .describe(field, key)
                .map(str::to_string)
                .unwrap_or_else(|| key.to_string())
        })
    }

    /// Drop every cached description of `field`.
    pub fn invalidate(&mut self, field: VocabularyField) {
        if self.scopes.remove(field.name()).is_some() {
            self.dirty = true;
            crate::debug_event!("index", "descriptions invalidated", "{field}");
        }
    }

    pub fn clear(&mut self) {
        if !self.scopes.is_empty() {
            self.scopes.clear();
            self.dirty = true;
        }
    }

    /// Number of cached entries across all scopes.
    pub fn len(&self) -> usize {
        self.scopes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scope_len(&self, field: VocabularyField) -> usize {
        self.scopes.get(field.name()).map_or(0, BTreeMap::len)
    }
}
