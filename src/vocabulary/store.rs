//! Per-field catalogs of legal values for one repository.
//!
//! Each [`VocabularyField`] owns two catalogs under the repository's
//! metadata directory:
//!
//! ```text
//! .conf/
//!   country-available.json   global defaults plus repository additions
//!   country-used.json        subset enabled for this repository
//!   ...
//! ```
//!
//! `used ⊆ available` holds after every mutation. Removals consult a
//! [`KeyReferences`] implementation (the document index) and are refused
//! while any document still references the key.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::catalog::Catalog;
use super::error::{VocabularyError, VocabularyResult};
use super::field::VocabularyField;

/// Notification raised after a successful catalog mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum VocabularyEvent {
    AvailableUpdated(VocabularyField),
    UsedUpdated(VocabularyField),
}

impl VocabularyEvent {
    pub fn field(&self) -> VocabularyField {
        match self {
            VocabularyEvent::AvailableUpdated(field) | VocabularyEvent::UsedUpdated(field) => *field,
        }
    }
}

/// Where a key stands relative to a field's catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Enabled for this repository.
    Used,
    /// Known globally but not enabled here.
    Available,
    Unknown,
}

/// Answers how many documents reference a key.
///
/// Implemented by the document index; the store only needs the count to
/// guard removals.
pub trait KeyReferences {
    fn references(&self, field: VocabularyField, key: &str) -> usize;
}

#[derive(Debug, Clone, Default)]
struct FieldCatalogs {
    available: Catalog,
    used: Catalog,
}

/// Persistent store of available/used catalogs for every field.
#[derive(Debug)]
pub struct VocabularyStore {
    conf_dir: PathBuf,
    seed_defaults: bool,
    fields: [FieldCatalogs; VocabularyField::ALL.len()],
}

impl VocabularyStore {
    /// Open the catalogs under `conf_dir`, creating any that are missing.
    ///
    /// Missing `available` catalogs are seeded from the built-in defaults
    /// when `seed_defaults` is set and the field has any.
    pub fn open(conf_dir: impl Into<PathBuf>, seed_defaults: bool) -> VocabularyResult<Self> {
        let conf_dir = conf_dir.into();
        std::fs::create_dir_all(&conf_dir)?;

        let mut store = Self {
            conf_dir,
            seed_defaults,
            fields: Default::default(),
        };
        store.reload()?;

        Ok(store)
    }

    /// Re-read every catalog from disk, picking up external edits.
    pub fn reload(&mut self) -> VocabularyResult<()> {
        let mut fields: [FieldCatalogs; VocabularyField::ALL.len()] = Default::default();
        for field in VocabularyField::ALL {
            fields[field.index()] = self.bootstrap(field)?;
        }
        self.fields = fields;
        Ok(())
    }

    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }

    fn available_path(&self, field: VocabularyField) -> PathBuf {
        self.conf_dir.join(field.available_file())
    }

    fn used_path(&self, field: VocabularyField) -> PathBuf {
        self.conf_dir.join(field.used_file())
    }

    fn bootstrap(&self, field: VocabularyField) -> VocabularyResult<FieldCatalogs> {
        let available_path = self.available_path(field);
        let available = if available_path.exists() {
            Catalog::load(&available_path)?
        } else {
            let seeded = match field.defaults() {
                Some(pairs) if self.seed_defaults => Catalog::from_pairs(pairs),
                _ => Catalog::new(),
            };
            seeded.save(&available_path)?;
            crate::log_event!(
                "vocabulary",
                "created",
                "{} ({} entries)",
                available_path.display(),
                seeded.len()
            );
            seeded
        };

        let used_path = self.used_path(field);
        let mut used = if used_path.exists() {
            Catalog::load(&used_path)?
        } else {
            let empty = Catalog::new();
            empty.save(&used_path)?;
            crate::debug_event!("vocabulary", "created", "{}", used_path.display());
            empty
        };

        let dropped = used.retain_subset_of(&available);
        if !dropped.is_empty() {
            tracing::warn!(
                "[vocabulary] {field}: dropping used keys missing from available: {}",
                dropped.join(", ")
            );
            used.save(&used_path)?;
        }

        Ok(FieldCatalogs { available, used })
    }

    fn catalogs(&self, field: VocabularyField) -> &FieldCatalogs {
        &self.fields[field.index()]
    }

    pub fn load_available(&self, field: VocabularyField) -> &Catalog {
        &self.catalogs(field).available
    }

    pub fn load_used(&self, field: VocabularyField) -> &Catalog {
        &self.catalogs(field).used
    }

    pub fn exists_available(&self, field: VocabularyField, key: &str) -> bool {
        self.load_available(field).contains(key)
    }

    pub fn exists_used(&self, field: VocabularyField, key: &str) -> bool {
        self.load_used(field).contains(key)
    }

    pub fn status(&self, field: VocabularyField, key: &str) -> KeyStatus {
        if self.exists_used(field, key) {
            KeyStatus::Used
        } else if self.exists_available(field, key) {
            KeyStatus::Available
        } else {
            KeyStatus::Unknown
        }
    }

    /// Human description of a key, taken from the available catalog.
    pub fn describe(&self, field: VocabularyField, key: &str) -> Option<&str> {
        self.load_available(field).get(key)
    }

    /// Add or update a key in the available catalog.
    pub fn add_available(
        &mut self,
        field: VocabularyField,
        key: &str,
        description: &str,
    ) -> VocabularyResult<Vec<VocabularyEvent>> {
        check_key(field, key)?;

        let mut available = self.load_available(field).clone();
        available.insert(key, description);
        available.save(&self.available_path(field))?;
        self.entry(field).available = available;

        crate::log_event!("vocabulary", "available added", "{field}:{key}");
        Ok(vec![VocabularyEvent::AvailableUpdated(field)])
    }

    /// Enable a key for this repository. The key must already be available.
    pub fn add_used(
        &mut self,
        field: VocabularyField,
        key: &str,
        description: &str,
    ) -> VocabularyResult<Vec<VocabularyEvent>> {
        check_key(field, key)?;
        if !self.exists_available(field, key) {
            return Err(VocabularyError::UnknownKey {
                field,
                key: key.to_string(),
            });
        }

        let mut used = self.load_used(field).clone();
        used.insert(key, description);
        used.save(&self.used_path(field))?;
        self.entry(field).used = used;

        crate::log_event!("vocabulary", "used added", "{field}:{key}");
        Ok(vec![VocabularyEvent::UsedUpdated(field)])
    }

    /// Disable a key for this repository.
    ///
    /// Refused with [`VocabularyError::RemovalBlocked`] while any document
    /// references it; nothing is written in that case.
    pub fn remove_used(
        &mut self,
        field: VocabularyField,
        key: &str,
        references: &dyn KeyReferences,
    ) -> VocabularyResult<Vec<VocabularyEvent>> {
        if !self.exists_used(field, key) {
            return Err(VocabularyError::UnknownKey {
                field,
                key: key.to_string(),
            });
        }
        guard_removal(field, key, references)?;

        let mut used = self.load_used(field).clone();
        used.remove(key);
        used.save(&self.used_path(field))?;
        self.entry(field).used = used;

        crate::log_event!("vocabulary", "used removed", "{field}:{key}");
        Ok(vec![VocabularyEvent::UsedUpdated(field)])
    }

    /// Remove a key from the available catalog, and from `used` with it.
    pub fn remove_available(
        &mut self,
        field: VocabularyField,
        key: &str,
        references: &dyn KeyReferences,
    ) -> VocabularyResult<Vec<VocabularyEvent>> {
        if !self.exists_available(field, key) {
            return Err(VocabularyError::UnknownKey {
                field,
                key: key.to_string(),
            });
        }
        guard_removal(field, key, references)?;

        let mut events = Vec::with_capacity(2);

        // Used first: if the available write then fails, used is still a subset.
        if self.exists_used(field, key) {
            let mut used = self.load_used(field).clone();
            used.remove(key);
            used.save(&self.used_path(field))?;
            self.entry(field).used = used;
            events.push(VocabularyEvent::UsedUpdated(field));
        }

        let mut available = self.load_available(field).clone();
        available.remove(key);
        available.save(&self.available_path(field))?;
        self.entry(field).available = available;
        events.push(VocabularyEvent::AvailableUpdated(field));

        crate::log_event!("vocabulary", "available removed", "{field}:{key}");
        Ok(events)
    }

    fn entry(&mut self, field: VocabularyField) -> &mut FieldCatalogs {
        &mut self.fields[field.index()]
    }
}

fn guard_removal(
    field: VocabularyField,
    key: &str,
    references: &dyn KeyReferences,
) -> VocabularyResult<()> {
    let count = references.references(field, key);
    if count > 0 {
        tracing::warn!("[vocabulary] refusing to remove {field}:{key}, {count} reference(s)");
        return Err(VocabularyError::RemovalBlocked {
            field,
            key: key.to_string(),
            count,
        });
    }
    Ok(())
}

/// Keys end up inside filenames, so they must survive the dash split.
fn check_key(field: VocabularyField, key: &str) -> VocabularyResult<()> {
    let invalid = |reason: &str| VocabularyError::InvalidKey {
        field,
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'))
    {
        return Err(invalid("only letters, digits, '_' and '.' are allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Reference counter backed by a fixed list of (field, key) pairs.
    struct FixedReferences(Vec<(VocabularyField, &'static str)>);

    impl KeyReferences for FixedReferences {
        fn references(&self, field: VocabularyField, key: &str) -> usize {
            self.0
                .iter()
                .filter(|(f, k)| *f == field && k.eq_ignore_ascii_case(key))
                .count()
        }
    }

    fn no_references() -> FixedReferences {
        FixedReferences(Vec::new())
    }

    fn assert_subset(store: &VocabularyStore) {
        for field in VocabularyField::ALL {
            for key in store.load_used(field).keys() {
                assert!(
                    store.exists_available(field, key),
                    "{field}:{key} is used but not available"
                );
            }
        }
    }

    #[test]
    fn test_bootstrap_seeds_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let conf = temp_dir.path().join(".conf");
        let store = VocabularyStore::open(&conf, true).unwrap();

        assert!(store.exists_available(VocabularyField::Country, "ES"));
        assert!(store.load_available(VocabularyField::Group).is_empty());
        assert!(store.load_used(VocabularyField::Country).is_empty());

        for field in VocabularyField::ALL {
            assert!(conf.join(field.available_file()).exists());
            assert!(conf.join(field.used_file()).exists());
        }
    }

    #[test]
    fn test_bootstrap_without_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = VocabularyStore::open(temp_dir.path(), false).unwrap();
        assert!(store.load_available(VocabularyField::Country).is_empty());
    }

    #[test]
    fn test_existing_catalogs_are_not_reseeded() {
        let temp_dir = TempDir::new().unwrap();
        let references = no_references();
        {
            let mut store = VocabularyStore::open(temp_dir.path(), true).unwrap();
            store
                .remove_available(VocabularyField::Country, "ES", &references)
                .unwrap();
        }

        let store = VocabularyStore::open(temp_dir.path(), true).unwrap();
        assert!(!store.exists_available(VocabularyField::Country, "ES"));
        assert!(store.exists_available(VocabularyField::Country, "FR"));
    }

    #[test]
    fn test_add_used_requires_available() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();

        let result = store.add_used(VocabularyField::Group, "HR", "Human resources");
        assert!(matches!(result, Err(VocabularyError::UnknownKey { .. })));

        store
            .add_available(VocabularyField::Group, "HR", "Human resources")
            .unwrap();
        let events = store
            .add_used(VocabularyField::Group, "hr", "Human resources")
            .unwrap();

        assert_eq!(events, vec![VocabularyEvent::UsedUpdated(VocabularyField::Group)]);
        assert_eq!(store.status(VocabularyField::Group, "HR"), KeyStatus::Used);
        assert_subset(&store);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();

        for key in ["", "with-dash", "with space", "ñ"] {
            let result = store.add_available(VocabularyField::Group, key, "x");
            assert!(
                matches!(result, Err(VocabularyError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_removal_blocked_while_referenced() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();
        store.add_available(VocabularyField::Group, "HR", "Human resources").unwrap();
        store.add_used(VocabularyField::Group, "HR", "Human resources").unwrap();

        let referenced = FixedReferences(vec![(VocabularyField::Group, "hr")]);
        let result = store.remove_used(VocabularyField::Group, "HR", &referenced);
        match result {
            Err(VocabularyError::RemovalBlocked { count, .. }) => assert_eq!(count, 1),
            other => panic!("expected RemovalBlocked, got {other:?}"),
        }
        assert!(store.exists_used(VocabularyField::Group, "HR"));

        // Nothing was written either
        let reopened = VocabularyStore::open(temp_dir.path(), false).unwrap();
        assert!(reopened.exists_used(VocabularyField::Group, "HR"));

        store
            .remove_used(VocabularyField::Group, "HR", &no_references())
            .unwrap();
        assert!(!store.exists_used(VocabularyField::Group, "HR"));
        let reopened = VocabularyStore::open(temp_dir.path(), false).unwrap();
        assert!(!reopened.exists_used(VocabularyField::Group, "HR"));
    }

    #[test]
    fn test_remove_available_cascades_to_used() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();
        store.add_available(VocabularyField::SentBy, "ACME", "Acme Corp").unwrap();
        store.add_used(VocabularyField::SentBy, "ACME", "Acme Corp").unwrap();

        let events = store
            .remove_available(VocabularyField::SentBy, "ACME", &no_references())
            .unwrap();

        assert_eq!(
            events,
            vec![
                VocabularyEvent::UsedUpdated(VocabularyField::SentBy),
                VocabularyEvent::AvailableUpdated(VocabularyField::SentBy),
            ]
        );
        assert!(!store.exists_used(VocabularyField::SentBy, "ACME"));
        assert_subset(&store);
    }

    #[test]
    fn test_remove_unknown_key() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();
        let result = store.remove_used(VocabularyField::Group, "NOPE", &no_references());
        assert!(matches!(result, Err(VocabularyError::UnknownKey { .. })));
    }

    #[test]
    fn test_reload_enforces_subset() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();

        // An external edit enables a key that is not available
        let used = Catalog::from_pairs(&[("GHOST", "Not available")]);
        used.save(&temp_dir.path().join(VocabularyField::Group.used_file()))
            .unwrap();

        store.reload().unwrap();
        assert!(!store.exists_used(VocabularyField::Group, "GHOST"));
        assert_subset(&store);
    }

    #[test]
    fn test_failed_save_leaves_memory_and_disk_intact() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = VocabularyStore::open(temp_dir.path(), false).unwrap();
        store.add_available(VocabularyField::Group, "HR", "Human resources").unwrap();

        // Replace the catalog file with a non-empty directory so the rename fails
        let path = temp_dir.path().join(VocabularyField::Group.available_file());
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let result = store.add_available(VocabularyField::Group, "FIN", "Finance");
        assert!(matches!(result, Err(VocabularyError::Persist { .. })));
        assert!(!store.exists_available(VocabularyField::Group, "FIN"));
        assert!(store.exists_available(VocabularyField::Group, "HR"));
    }
}
