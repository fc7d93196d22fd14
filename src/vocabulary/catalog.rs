//! Key → description maps persisted as JSON objects.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{VocabularyError, VocabularyResult};
use crate::utils::write_atomic;

/// Ordered catalog of legal keys for one side (available or used) of a field.
///
/// Keys are matched case-insensitively; the spelling of the first insertion
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(IndexMap<String, String>);

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut catalog = Self::new();
        for (key, description) in pairs {
            catalog.insert(key, description);
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.0.keys().position(|k| k.eq_ignore_ascii_case(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Description stored for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key)
            .and_then(|i| self.0.get_index(i))
            .map(|(_, description)| description.as_str())
    }

    /// Insert or update an entry. Returns `true` if the key was new.
    pub fn insert(&mut self, key: &str, description: &str) -> bool {
        match self.position(key) {
            Some(i) => {
                if let Some((_, existing)) = self.0.get_index_mut(i) {
                    *existing = description.to_string();
                }
                false
            }
            None => {
                self.0.insert(key.to_string(), description.to_string());
                true
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<(String, String)> {
        let i = self.position(key)?;
        self.0.shift_remove_index(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Drop every key missing from `superset`, returning the dropped keys.
    pub fn retain_subset_of(&mut self, superset: &Catalog) -> Vec<String> {
        let dropped: Vec<String> = self
            .0
            .keys()
            .filter(|k| !superset.contains(k))
            .cloned()
            .collect();
        self.0.retain(|k, _| superset.contains(k));
        dropped
    }

    pub fn load(path: &Path) -> VocabularyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| VocabularyError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the catalog atomically; on failure the previous file is untouched.
    pub fn save(&self, path: &Path) -> VocabularyResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| VocabularyError::Persist {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

        write_atomic(path, content.as_bytes()).map_err(|source| VocabularyError::Persist {
            path: path.to_path_buf(),
            source,
        })
    }
}
