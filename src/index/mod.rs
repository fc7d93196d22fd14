//! Document index and query engine.
//!
//! The index owns the in-memory document collection, the description cache
//! and the repository watcher. It is rebuilt by [`DocumentIndex::rescan`],
//! which also repairs malformed filenames when self-healing is enabled.
//! Commands that touch the filesystem (import, rename, delete) always rescan
//! afterwards, whether or not the operation succeeded.

mod descriptions;
mod document;
mod filter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::codec::{self, CodecError};
use crate::error::{RepositoryError, RepositoryResult};
use crate::fs::{FsError, Filesystem};
use crate::utils::is_hidden_name;
use crate::vocabulary::{KeyReferences, VocabularyEvent, VocabularyField, VocabularyStore};
use crate::watcher::{ChangeSet, RepositoryWatcher};

pub use descriptions::{DESCRIPTIONS_FILE, DescriptionCache};
pub use document::Document;
pub use filter::{DateFilter, DocumentFilter, FilterError, FilterState, FnFilter, Selector};

/// Totals from one rescan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RescanStats {
    pub documents: usize,
    pub active: usize,
    /// Files renamed to their normalized name.
    pub healed: usize,
    /// Malformed files left alone because the normalized name was taken.
    pub heal_skipped: usize,
}

pub struct DocumentIndex {
    root: PathBuf,
    conf_dir: PathBuf,
    fs: Arc<dyn Filesystem>,
    documents: IndexMap<String, Document>,
    descriptions: DescriptionCache,
    watcher: RepositoryWatcher,
    filters: Vec<Box<dyn DocumentFilter>>,
    self_heal: bool,
    /// Bumped by every successful rescan.
    generation: u64,
}

impl DocumentIndex {
    /// Create an empty index for `root`. Call [`rescan`](Self::rescan) to populate it.
    pub fn new(root: impl Into<PathBuf>, conf_dir: impl Into<PathBuf>, fs: Arc<dyn Filesystem>, self_heal: bool) -> Self {
        let root = root.into();
        let conf_dir = conf_dir.into();
        let descriptions = DescriptionCache::load(&conf_dir.join(DESCRIPTIONS_FILE));
        let watcher = RepositoryWatcher::new(&root, Arc::clone(&fs));

        Self {
            root,
            conf_dir,
            fs,
            documents: IndexMap::new(),
            descriptions,
            watcher,
            filters: Vec::new(),
            self_heal,
            generation: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn watcher(&self) -> &RepositoryWatcher {
        &self.watcher
    }

    pub fn watcher_mut(&mut self) -> &mut RepositoryWatcher {
        &mut self.watcher
    }

    pub fn descriptions(&self) -> &DescriptionCache {
        &self.descriptions
    }

    /// Point the index at another repository.
    ///
    /// Documents are dropped, the description cache is reloaded from the new
    /// metadata directory and the watcher restarts inactive with an empty
    /// baseline. Registered filters are kept.
    pub fn switch_to(&mut self, root: impl Into<PathBuf>, conf_dir: impl Into<PathBuf>) {
        self.root = root.into();
        self.conf_dir = conf_dir.into();
        self.documents.clear();
        self.descriptions = DescriptionCache::load(&self.conf_dir.join(DESCRIPTIONS_FILE));
        self.watcher.reset(&self.root);
    }

    /// Rebuild the collection from the repository directory.
    pub fn rescan(&mut self, vocabulary: &VocabularyStore) -> RepositoryResult<RescanStats> {
        let entries = self.fs.list(&self.root)?;
        let mut stats = RescanStats::default();
        let mut documents = IndexMap::with_capacity(entries.len());

        for entry in entries.into_iter().filter(|entry| !entry.is_dir) {
            let Some(mut name) = entry.path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                tracing::warn!("[index] skipping non UTF-8 filename {}", entry.path.display());
                continue;
            };
            let mut path = entry.path;

            if self.self_heal {
                if let Err(CodecError::WrongFieldCount { .. }) = codec::split(&name) {
                    match self.heal(&path, &name) {
                        Ok(Some(healed)) => {
                            path = self.root.join(&healed);
                            name = healed;
                            stats.healed += 1;
                        }
                        Ok(None) => stats.heal_skipped += 1,
                        Err(e) => {
                            tracing::warn!("[index] could not normalize {name}: {e}");
                            stats.heal_skipped += 1;
                        }
                    }
                }
            }

            let document = Document::new(name.clone(), path, vocabulary, &mut self.descriptions);
            documents.insert(name, document);
        }

        documents.sort_keys();
        self.documents = documents;

        stats.documents = self.documents.len();
        stats.active = self.active_count();
        self.generation += 1;
        self.save_descriptions();

        crate::log_event!(
            "index",
            "rescanned",
            "{} documents, {} active, {} healed",
            stats.documents,
            stats.active,
            stats.healed
        );
        Ok(stats)
    }

    /// Rename a malformed file to its normalized name.
    ///
    /// Returns `Ok(None)` when the target already exists.
    fn heal(&self, path: &Path, name: &str) -> Result<Option<String>, FsError> {
        let normalized = codec::normalize(name);
        if normalized == name {
            return Ok(None);
        }

        let target = self.root.join(&normalized);
        if self.fs.exists(&target) {
            tracing::warn!("[index] not normalizing {name}: {normalized} already exists");
            return Ok(None);
        }

        self.fs.rename(path, &target)?;
        crate::log_event!("index", "normalized", "{name} -> {normalized}");
        Ok(Some(normalized))
    }

    fn save_descriptions(&mut self) {
        let path = self.conf_dir.join(DESCRIPTIONS_FILE);
        if let Err(e) = self.descriptions.save(&path) {
            // The cache is derived data; losing it only costs recomputation.
            tracing::warn!("[index] {}", RepositoryError::Cache { path, source: e });
        }
    }

    /// Run one watcher step and rescan when something changed.
    pub fn poll(&mut self, vocabulary: &VocabularyStore) -> RepositoryResult<Option<(ChangeSet, RescanStats)>> {
        let Some(changes) = self.watcher.tick()? else {
            return Ok(None);
        };
        match self.rescan(vocabulary) {
            Ok(stats) => Ok(Some((changes, stats))),
            Err(e) => {
                // Report the same changes again on the next tick
                self.watcher.rollback();
                Err(e)
            }
        }
    }

    /// Number of successful rescans so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Refresh descriptions and activity after a catalog change.
    pub fn on_vocabulary_event(&mut self, event: &VocabularyEvent, vocabulary: &VocabularyStore) {
        self.descriptions.invalidate(event.field());
        for document in self.documents.values_mut() {
            document.classify(vocabulary, &mut self.descriptions);
        }
        self.save_descriptions();
    }

    /// Whether any document references `key`, and which ones.
    pub fn field_used(&self, field: VocabularyField, key: &str) -> (bool, Vec<&Document>) {
        let documents: Vec<&Document> = self
            .documents
            .values()
            .filter(|document| document.references(field, key))
            .collect();
        (!documents.is_empty(), documents)
    }

    /// Documents accepted by the filter state and every registered filter, in name order.
    pub fn query(&self, state: &FilterState) -> Vec<&Document> {
        self.documents
            .values()
            .filter(|document| state.matches(document))
            .filter(|document| self.filters.iter().all(|filter| filter.matches(document, state)))
            .collect()
    }

    pub fn register_filter(&mut self, filter: Box<dyn DocumentFilter>) {
        crate::debug_event!("index", "filter registered", "{}", filter.name());
        self.filters.push(filter);
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|filter| filter.name())
    }

    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents.get(name)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.documents.values().filter(|document| document.is_active()).count()
    }

    pub fn inactive_count(&self) -> usize {
        self.len() - self.active_count()
    }

    /// Copy an external file into the repository under its normalized name.
    ///
    /// Returns the name the document was stored under.
    pub fn import(&mut self, source: &Path, vocabulary: &VocabularyStore) -> RepositoryResult<String> {
        let result = self.copy_in(source);
        self.finish_command("import", result, vocabulary)
    }

    fn copy_in(&self, source: &Path) -> RepositoryResult<String> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RepositoryError::invalid_name(&source.display().to_string(), "not a UTF-8 file name"))?;

        let target_name = codec::normalize(name);
        check_name(&target_name)?;
        self.fs.copy(source, &self.root.join(&target_name))?;
        crate::log_event!("index", "imported", "{} as {target_name}", source.display());
        Ok(target_name)
    }

    /// Rename a document within the repository.
    pub fn rename(&mut self, from: &str, to: &str, vocabulary: &VocabularyStore) -> RepositoryResult<()> {
        let result = self.move_within(from, to);
        self.finish_command("rename", result, vocabulary)
    }

    fn move_within(&self, from: &str, to: &str) -> RepositoryResult<()> {
        self.require(from)?;
        check_name(to)?;
        if from == to {
            return Ok(());
        }
        self.fs.rename(&self.root.join(from), &self.root.join(to))?;
        crate::log_event!("index", "renamed", "{from} -> {to}");
        Ok(())
    }

    /// Delete a document from the repository.
    pub fn delete(&mut self, name: &str, vocabulary: &VocabularyStore) -> RepositoryResult<()> {
        let result = self.require(name).and_then(|_| {
            self.fs.remove(&self.root.join(name))?;
            crate::log_event!("index", "deleted", "{name}");
            Ok(())
        });
        self.finish_command("delete", result, vocabulary)
    }

    fn require(&self, name: &str) -> RepositoryResult<&Document> {
        self.documents
            .get(name)
            .ok_or_else(|| RepositoryError::DocumentNotFound(name.to_string()))
    }

    /// Rescan after a command; the command's own error wins over a rescan error.
    fn finish_command<T>(
        &mut self,
        command: &str,
        result: RepositoryResult<T>,
        vocabulary: &VocabularyStore,
    ) -> RepositoryResult<T> {
        let rescanned = self.rescan(vocabulary);
        match (result, rescanned) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), rescanned) => {
                if let Err(rescan_error) = rescanned {
                    tracing::warn!("[index] rescan after failed {command}: {rescan_error}");
                }
                Err(e)
            }
        }
    }
}

impl KeyReferences for DocumentIndex {
    fn references(&self, field: VocabularyField, key: &str) -> usize {
        self.field_used(field, key).1.len()
    }
}

/// A document name must be a plain, visible file name.
fn check_name(name: &str) -> RepositoryResult<()> {
    if name.is_empty() {
        return Err(RepositoryError::invalid_name(name, "empty name"));
    }
    if name.contains(['/', '\\']) {
        return Err(RepositoryError::invalid_name(name, "contains a path separator"));
    }
    if is_hidden_name(name) {
        return Err(RepositoryError::invalid_name(name, "hidden files are not indexed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFilesystem;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        vocabulary: VocabularyStore,
        index: DocumentIndex,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let conf = dir.path().join(".conf");
            let vocabulary = VocabularyStore::open(&conf, true).unwrap();
            let index = DocumentIndex::new(dir.path(), &conf, Arc::new(LocalFilesystem::new()), true);
            Self { dir, vocabulary, index }
        }

        fn touch(&self, name: &str) {
            std::fs::write(self.dir.path().join(name), name.as_bytes()).unwrap();
        }

        fn enable(&mut self, field: VocabularyField, key: &str) {
            let events = self.vocabulary.add_available(field, key, key).unwrap();
            for event in events {
                self.index.on_vocabulary_event(&event, &self.vocabulary);
            }
            let events = self.vocabulary.add_used(field, key, key).unwrap();
            for event in events {
                self.index.on_vocabulary_event(&event, &self.vocabulary);
            }
        }

        fn rescan(&mut self) -> RescanStats {
            self.index.rescan(&self.vocabulary).unwrap()
        }
    }

    #[test]
    fn test_rescan_heals_malformed_names() {
        let mut fx = Fixture::new();
        fx.touch("report.pdf");
        fx.touch("README");

        let stats = fx.rescan();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.healed, 1);
        assert!(fx.dir.path().join("-----report-.pdf").exists());
        assert!(!fx.dir.path().join("report.pdf").exists());

        // Missing extensions are not repaired, only flagged
        let readme = fx.index.get("README").unwrap();
        assert_eq!(readme.issues, vec![CodecError::MissingExtension]);

        // A second rescan has nothing left to heal
        assert_eq!(fx.rescan().healed, 0);
    }

    #[test]
    fn test_rescan_skips_heal_on_collision() {
        let mut fx = Fixture::new();
        fx.touch("report.pdf");
        fx.touch("-----report-.pdf");

        let stats = fx.rescan();
        assert_eq!(stats.healed, 0);
        assert_eq!(stats.heal_skipped, 1);
        assert!(fx.index.get("report.pdf").is_some());
        assert!(!fx.index.get("report.pdf").unwrap().is_valid());
    }

    #[test]
    fn test_rescan_without_self_heal() {
        let mut fx = Fixture::new();
        fx.index.self_heal = false;
        fx.touch("report.pdf");

        fx.rescan();
        assert!(fx.dir.path().join("report.pdf").exists());
        assert!(fx.index.get("report.pdf").is_some());
    }

    #[test]
    fn test_rescan_ignores_hidden_entries_and_directories() {
        let mut fx = Fixture::new();
        fx.touch(".DS_Store");
        std::fs::create_dir(fx.dir.path().join("archive")).unwrap();
        fx.touch("20240105-ES-HR-ACME-INV-rent-ME.pdf");

        fx.rescan();
        assert_eq!(fx.index.len(), 1);
        assert_eq!(fx.index.documents().next().unwrap().name, "20240105-ES-HR-ACME-INV-rent-ME.pdf");
    }

    #[test]
    fn test_vocabulary_event_reclassifies_documents() {
        let mut fx = Fixture::new();
        fx.touch("20240105-ES-HR-ACME-INV-rent-ME.pdf");
        fx.rescan();
        assert_eq!(fx.index.active_count(), 0);

        for (field, key) in [
            (VocabularyField::Country, "ES"),
            (VocabularyField::Group, "HR"),
            (VocabularyField::SentBy, "ACME"),
            (VocabularyField::Purpose, "INV"),
            (VocabularyField::SentTo, "ME"),
        ] {
            fx.enable(field, key);
        }

        // No rescan: the vocabulary events alone update activity
        assert_eq!(fx.index.active_count(), 1);
        assert_eq!(fx.index.inactive_count(), 0);
    }

    #[test]
    fn test_field_used_and_references() {
        let mut fx = Fixture::new();
        fx.touch("20240105-ES-HR-ACME-INV-rent-ME.pdf");
        fx.touch("20240106-ES-OPS-ACME-INV-fuel-ME.pdf");
        fx.rescan();

        let (used, documents) = fx.index.field_used(VocabularyField::Group, "hr");
        assert!(used);
        assert_eq!(documents.len(), 1);
        assert_eq!(fx.index.references(VocabularyField::SentBy, "ACME"), 2);
        assert_eq!(fx.index.references(VocabularyField::Group, "FIN"), 0);
    }

    #[test]
    fn test_commands_rescan_even_on_failure() {
        let mut fx = Fixture::new();
        fx.touch("20240105-ES-HR-ACME-INV-rent-ME.pdf");
        fx.rescan();

        // Out-of-band change the index has not seen yet
        fx.touch("20240107-ES-HR-ACME-INV-water-ME.pdf");

        let err = fx.index.delete("missing.pdf", &fx.vocabulary).unwrap_err();
        assert!(matches!(err, RepositoryError::DocumentNotFound(_)));
        assert_eq!(fx.index.len(), 2);
    }

    #[test]
    fn test_rename_validates_target() {
        let mut fx = Fixture::new();
        fx.touch("20240105-ES-HR-ACME-INV-rent-ME.pdf");
        fx.rescan();

        for bad in ["", "../escape.pdf", ".hidden.pdf"] {
            let err = fx
                .index
                .rename("20240105-ES-HR-ACME-INV-rent-ME.pdf", bad, &fx.vocabulary)
                .unwrap_err();
            assert!(matches!(err, RepositoryError::InvalidName { .. }), "{bad:?}");
        }

        fx.index
            .rename(
                "20240105-ES-HR-ACME-INV-rent-ME.pdf",
                "20240105-ES-FIN-ACME-INV-rent-ME.pdf",
                &fx.vocabulary,
            )
            .unwrap();
        assert!(fx.index.get("20240105-ES-HR-ACME-INV-rent-ME.pdf").is_none());
        assert!(fx.index.get("20240105-ES-FIN-ACME-INV-rent-ME.pdf").is_some());
    }

    #[test]
    fn test_registered_filter_narrows_query() {
        let mut fx = Fixture::new();
        fx.touch("a.pdf");
        fx.touch("b.txt");
        fx.rescan();

        let review = FilterState::new().with_review(true);
        assert_eq!(fx.index.query(&review).len(), 2);

        fx.index.register_filter(Box::new(FnFilter::new("pdf-only", |doc: &Document, _: &FilterState| {
            doc.name.ends_with(".pdf")
        })));
        let names: Vec<&str> = fx.index.query(&review).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["-----a-.pdf"]);
        assert_eq!(fx.index.filter_names().collect::<Vec<_>>(), vec!["pdf-only"]);
    }
}
