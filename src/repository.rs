//! Repository facade.
//!
//! [`Repository`] wires the vocabulary store, the document index and the
//! event bus together for one directory. It is the only place that turns
//! component results into [`RepositoryEvent`]s, and it owns the polling loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};

use crate::codec::{self, DecodedFields};
use crate::config::Settings;
use crate::error::{RepositoryError, RepositoryResult};
use crate::events::{EventBus, ListenerId, RepositoryEvent};
use crate::fs::{Filesystem, FsError, LocalFilesystem};
use crate::index::{Document, DocumentFilter, DocumentIndex, FilterState, RescanStats};
use crate::utils::write_atomic;
use crate::vocabulary::{VocabularyEvent, VocabularyField, VocabularyStore};
use crate::watcher::{ChangeSet, WatchError, WatcherHandle};

/// Highest on-disk format this build understands.
pub const FORMAT_VERSION: u32 = 1;
pub const MARKER_FILE: &str = "repository.toml";

#[derive(Debug, Serialize, Deserialize)]
struct FormatMarker {
    format: u32,
}

pub struct Repository {
    root: PathBuf,
    settings: Arc<Settings>,
    fs: Arc<dyn Filesystem>,
    vocabulary: VocabularyStore,
    index: DocumentIndex,
    events: EventBus,
}

impl Repository {
    /// Open an existing directory on the local filesystem.
    pub fn open(root: impl Into<PathBuf>, settings: Arc<Settings>) -> RepositoryResult<Self> {
        Self::open_with(root, settings, Arc::new(LocalFilesystem::new()))
    }

    /// Open with an explicit filesystem provider.
    ///
    /// Creates the metadata directory and catalogs if needed, runs the first
    /// rescan and activates the watcher when the settings ask for it.
    pub fn open_with(
        root: impl Into<PathBuf>,
        settings: Arc<Settings>,
        fs: Arc<dyn Filesystem>,
    ) -> RepositoryResult<Self> {
        let root = root.into();
        let (conf_dir, vocabulary) = prepare(&root, &settings, fs.as_ref())?;
        let index = DocumentIndex::new(&root, conf_dir, Arc::clone(&fs), settings.index.self_heal);

        let mut repository = Self {
            root,
            settings,
            fs,
            vocabulary,
            index,
            events: EventBus::new(),
        };
        repository.start()?;
        crate::log_event!("repository", "opened", "{}", repository.root.display());
        Ok(repository)
    }

    /// Create the directory if missing, then open it.
    pub fn init(root: impl Into<PathBuf>, settings: Arc<Settings>) -> RepositoryResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| FsError::Io {
            op: "create",
            path: root.clone(),
            source,
        })?;
        Self::open(root, settings)
    }

    fn start(&mut self) -> RepositoryResult<()> {
        self.rescan()?;
        self.index.watcher_mut().set_active(self.settings.watcher.enabled);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vocabulary(&self) -> &VocabularyStore {
        &self.vocabulary
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&RepositoryEvent) + Send + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Close this repository and open `root` in its place.
    ///
    /// Listeners and registered filters carry over. On failure the current
    /// repository stays open and untouched.
    pub fn switch_to(&mut self, root: impl Into<PathBuf>) -> RepositoryResult<()> {
        let root = root.into();
        let (conf_dir, vocabulary) = prepare(&root, &self.settings, self.fs.as_ref())?;

        self.index.switch_to(&root, conf_dir);
        self.vocabulary = vocabulary;
        self.root = root;

        crate::log_event!("repository", "switched", "{}", self.root.display());
        self.events.emit(&RepositoryEvent::RepositorySwitched {
            path: self.root.clone(),
        });
        self.start()
    }

    /// Rebuild the document collection and notify listeners.
    pub fn rescan(&mut self) -> RepositoryResult<RescanStats> {
        let stats = self.index.rescan(&self.vocabulary)?;
        self.emit_collection_changed();
        Ok(stats)
    }

    fn notify_if_rescanned(&mut self, generation: u64) {
        if self.index.generation() != generation {
            self.emit_collection_changed();
        }
    }

    fn emit_collection_changed(&mut self) {
        self.events.emit(&RepositoryEvent::CollectionChanged {
            documents: self.index.len(),
            active: self.index.active_count(),
        });
    }

    // Watching

    pub fn is_watching(&self) -> bool {
        self.index.watcher().is_active()
    }

    pub fn set_watching(&mut self, active: bool) {
        self.index.watcher_mut().set_active(active);
    }

    /// Handle for stopping [`watch`](Self::watch) from another task.
    pub fn watcher_handle(&self) -> Option<WatcherHandle> {
        self.index.watcher().handle()
    }

    /// One polling step: diff against the baseline and rescan on change.
    pub fn poll(&mut self) -> RepositoryResult<Option<ChangeSet>> {
        match self.index.poll(&self.vocabulary) {
            Ok(Some((changes, _))) => {
                self.events.emit(&RepositoryEvent::RepositoryUpdated(changes.clone()));
                self.emit_collection_changed();
                Ok(Some(changes))
            }
            Ok(None) => Ok(None),
            Err(RepositoryError::Watch(WatchError::Unavailable { path, reason })) => {
                self.events.emit(&RepositoryEvent::RepositoryUnavailable {
                    path: path.clone(),
                    reason: reason.clone(),
                });
                Err(WatchError::Unavailable { path, reason }.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll every `watcher.poll_interval_ms` until the watcher is deactivated.
    ///
    /// Returns `Ok(())` after `set_active(false)` (directly or through a
    /// [`WatcherHandle`]), and the watch error if the repository becomes
    /// unavailable. Rescan failures are logged and polling continues.
    pub async fn watch(&mut self) -> RepositoryResult<()> {
        let Some(handle) = self.watcher_handle() else {
            return Ok(());
        };

        let period = self.settings.watcher.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        crate::debug_event!("repository", "watching", "every {}ms", period.as_millis());
        loop {
            tokio::select! {
                _ = handle.cancelled() => break,
                _ = ticker.tick() => {
                    match self.poll() {
                        Ok(_) => {}
                        Err(e @ RepositoryError::Watch(_)) => return Err(e),
                        Err(e) => tracing::error!("[repository] poll failed: {e}"),
                    }
                }
            }
        }

        crate::debug_event!("repository", "stopped watching");
        Ok(())
    }

    // Queries

    pub fn query(&self, state: &FilterState) -> Vec<&Document> {
        self.index.query(state)
    }

    pub fn register_filter(&mut self, filter: Box<dyn DocumentFilter>) {
        self.index.register_filter(filter);
    }

    pub fn field_used(&self, field: VocabularyField, key: &str) -> (bool, Vec<&Document>) {
        self.index.field_used(field, key)
    }

    // Commands. Each one rescans whether or not it succeeded, and notifies
    // when that rescan went through.

    /// Copy a file into the repository under its normalized name.
    pub fn import(&mut self, source: &Path) -> RepositoryResult<String> {
        let generation = self.index.generation();
        let result = self.index.import(source, &self.vocabulary);
        self.notify_if_rescanned(generation);
        result
    }

    pub fn rename(&mut self, from: &str, to: &str) -> RepositoryResult<()> {
        let generation = self.index.generation();
        let result = self.index.rename(from, to, &self.vocabulary);
        self.notify_if_rescanned(generation);
        result
    }

    /// Rename a document so that its name encodes `fields`.
    pub fn rename_fields(&mut self, name: &str, fields: &DecodedFields) -> RepositoryResult<String> {
        let target = codec::encode(fields);
        check_fields(fields, &target)?;
        self.rename(name, &target)?;
        Ok(target)
    }

    pub fn delete(&mut self, name: &str) -> RepositoryResult<()> {
        let generation = self.index.generation();
        let result = self.index.delete(name, &self.vocabulary);
        self.notify_if_rescanned(generation);
        result
    }

    // Vocabulary

    pub fn add_available(&mut self, field: VocabularyField, key: &str, description: &str) -> RepositoryResult<()> {
        let events = self.vocabulary.add_available(field, key, description)?;
        self.dispatch(events);
        Ok(())
    }

    pub fn add_used(&mut self, field: VocabularyField, key: &str, description: &str) -> RepositoryResult<()> {
        let events = self.vocabulary.add_used(field, key, description)?;
        self.dispatch(events);
        Ok(())
    }

    /// Fails with `RemovalBlocked` while any document references the key.
    pub fn remove_used(&mut self, field: VocabularyField, key: &str) -> RepositoryResult<()> {
        let events = self.vocabulary.remove_used(field, key, &self.index)?;
        self.dispatch(events);
        Ok(())
    }

    /// Fails with `RemovalBlocked` while any document references the key.
    pub fn remove_available(&mut self, field: VocabularyField, key: &str) -> RepositoryResult<()> {
        let events = self.vocabulary.remove_available(field, key, &self.index)?;
        self.dispatch(events);
        Ok(())
    }

    /// Re-read the catalogs from disk after external edits.
    pub fn reload_vocabulary(&mut self) -> RepositoryResult<()> {
        self.vocabulary.reload()?;
        let events = VocabularyField::ALL
            .into_iter()
            .flat_map(|field| [VocabularyEvent::AvailableUpdated(field), VocabularyEvent::UsedUpdated(field)])
            .collect();
        self.dispatch(events);
        Ok(())
    }

    /// Index first, so listeners already see refreshed documents.
    fn dispatch(&mut self, events: Vec<VocabularyEvent>) {
        for event in events {
            self.index.on_vocabulary_event(&event, &self.vocabulary);
            self.events.emit(&RepositoryEvent::Vocabulary(event));
        }
    }
}

/// Check the directory and marker, then open the catalogs.
fn prepare(root: &Path, settings: &Settings, fs: &dyn Filesystem) -> RepositoryResult<(PathBuf, VocabularyStore)> {
    let entry = fs.stat(root)?;
    if !entry.is_dir {
        return Err(RepositoryError::invalid_name(&root.display().to_string(), "not a directory"));
    }

    let conf_dir = settings.conf_dir_for(root);
    ensure_marker(&conf_dir)?;
    let vocabulary = VocabularyStore::open(&conf_dir, settings.vocabulary.seed_defaults)?;
    Ok((conf_dir, vocabulary))
}

/// Read the format marker, writing it on first open.
fn ensure_marker(conf_dir: &Path) -> RepositoryResult<()> {
    let path = conf_dir.join(MARKER_FILE);
    let marker_error = |reason: String| RepositoryError::Marker {
        path: path.clone(),
        reason,
    };

    if path.exists() {
        let content = std::fs::read_to_string(&path).map_err(|e| marker_error(e.to_string()))?;
        let marker: FormatMarker = toml::from_str(&content).map_err(|e| marker_error(e.to_string()))?;
        if marker.format > FORMAT_VERSION {
            return Err(RepositoryError::UnsupportedFormat {
                found: marker.format,
                supported: FORMAT_VERSION,
            });
        }
        return Ok(());
    }

    std::fs::create_dir_all(conf_dir).map_err(|e| marker_error(e.to_string()))?;
    let content = toml::to_string(&FormatMarker {
        format: FORMAT_VERSION,
    })
    .map_err(|e| marker_error(e.to_string()))?;
    write_atomic(&path, content.as_bytes()).map_err(|e| marker_error(e.to_string()))?;
    crate::debug_event!("repository", "marker created", "{}", path.display());
    Ok(())
}

/// Every slot must survive a decode of the encoded name.
fn check_fields(fields: &DecodedFields, target: &str) -> RepositoryResult<()> {
    if fields.extension.is_empty() {
        return Err(RepositoryError::invalid_name(target, "missing extension"));
    }
    if fields.slots().iter().any(|slot| slot.contains('-')) {
        return Err(RepositoryError::invalid_name(target, "field values cannot contain '-'"));
    }
    if fields.extension.contains(['.', '-']) {
        return Err(RepositoryError::invalid_name(target, "invalid extension"));
    }
    let mut expected = fields.clone();
    expected.extension = expected.extension.to_lowercase();
    match codec::split(target) {
        Ok(decoded) if decoded == expected => Ok(()),
        _ => Err(RepositoryError::invalid_name(target, "fields do not round-trip")),
    }
}
