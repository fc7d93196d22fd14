//! Poll-based repository watcher.
//!
//! The watcher owns the last [`RepositorySnapshot`] and compares a fresh one
//! against it on every [`RepositoryWatcher::tick`]. Scheduling the ticks is
//! the caller's job (see `Repository::watch`); cancellation goes through a
//! [`CancellationToken`] so another task can stop the loop via a
//! [`WatcherHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use super::error::WatchError;
use super::snapshot::{ChangeSet, RepositorySnapshot};
use crate::fs::Filesystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Inactive,
    Active,
}

/// Cloneable remote control for an active watcher.
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    token: CancellationToken,
}

impl WatcherHandle {
    /// Same effect as `set_active(false)` on the owning watcher.
    pub fn deactivate(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the watcher has been deactivated.
    pub fn cancelled(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}

pub struct RepositoryWatcher {
    root: PathBuf,
    fs: Arc<dyn Filesystem>,
    baseline: RepositorySnapshot,
    /// Baseline replaced by the last reporting tick, kept for [`rollback`](Self::rollback).
    previous: Option<RepositorySnapshot>,
    token: Option<CancellationToken>,
}

impl RepositoryWatcher {
    /// Create an inactive watcher with an empty baseline.
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn Filesystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            baseline: RepositorySnapshot::empty(),
            previous: None,
            token: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn baseline(&self) -> &RepositorySnapshot {
        &self.baseline
    }

    pub fn state(&self) -> WatcherState {
        match &self.token {
            Some(token) if !token.is_cancelled() => WatcherState::Active,
            _ => WatcherState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == WatcherState::Active
    }

    /// Activate or deactivate polling. Idempotent in both directions.
    pub fn set_active(&mut self, active: bool) {
        if active {
            if !self.is_active() {
                self.token = Some(CancellationToken::new());
                crate::debug_event!("watcher", "activated", "{}", self.root.display());
            }
        } else if let Some(token) = self.token.take() {
            token.cancel();
            crate::debug_event!("watcher", "deactivated", "{}", self.root.display());
        }
    }

    /// Handle for deactivating from elsewhere. `None` while inactive.
    pub fn handle(&self) -> Option<WatcherHandle> {
        self.token
            .as_ref()
            .filter(|token| !token.is_cancelled())
            .map(|token| WatcherHandle {
                token: token.clone(),
            })
    }

    /// Tear down and point the watcher at another directory.
    ///
    /// The watcher ends up inactive with an empty baseline.
    pub fn reset(&mut self, root: impl Into<PathBuf>) {
        self.set_active(false);
        self.root = root.into();
        self.baseline = RepositorySnapshot::empty();
        self.previous = None;
    }

    /// Undo the baseline swap of the last tick that reported changes.
    ///
    /// Used when the change set could not be processed, so the next tick
    /// reports the same changes again. No-op if nothing is pending.
    pub fn rollback(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.baseline = previous;
            crate::debug_event!("watcher", "baseline rolled back", "{}", self.root.display());
        }
    }

    /// Run one polling step.
    ///
    /// Returns `Ok(None)` when inactive or when nothing changed. On change the
    /// baseline is replaced and the change set is returned. A listing failure
    /// deactivates the watcher and reports [`WatchError::Unavailable`].
    pub fn tick(&mut self) -> Result<Option<ChangeSet>, WatchError> {
        self.previous = None;
        let Some(token) = self.token.clone() else {
            return Ok(None);
        };
        if token.is_cancelled() {
            self.token = None;
            return Ok(None);
        }

        let current = match RepositorySnapshot::capture(self.fs.as_ref(), &self.root) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.set_active(false);
                tracing::warn!("[watcher] repository unavailable: {e}");
                return Err(WatchError::unavailable(&self.root, &e));
            }
        };

        // Deactivated while listing: drop the result, keep the old baseline.
        if token.is_cancelled() {
            self.token = None;
            return Ok(None);
        }

        let changes = self.baseline.diff(&current);
        if changes.is_empty() {
            tracing::trace!("[watcher] no changes in {}", self.root.display());
            return Ok(None);
        }

        crate::debug_event!(
            "watcher",
            "changes",
            "+{} -{} ~{}",
            changes.added.len(),
            changes.removed.len(),
            changes.modified.len()
        );
        self.previous = Some(std::mem::replace(&mut self.baseline, current));
        Ok(Some(changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFilesystem;
    use tempfile::TempDir;

    fn watcher_for(dir: &Path) -> RepositoryWatcher {
        RepositoryWatcher::new(dir, Arc::new(LocalFilesystem::new()))
    }

    #[test]
    fn test_inactive_watcher_does_nothing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"x").unwrap();

        let mut watcher = watcher_for(temp_dir.path());
        assert_eq!(watcher.state(), WatcherState::Inactive);
        assert!(watcher.tick().unwrap().is_none());
        assert!(watcher.baseline().is_empty());
    }

    #[test]
    fn test_second_tick_over_unchanged_directory_is_silent() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"x").unwrap();

        let mut watcher = watcher_for(temp_dir.path());
        watcher.set_active(true);

        let first = watcher.tick().unwrap().expect("first tick reports initial files");
        assert_eq!(first.added.len(), 1);
        assert!(watcher.tick().unwrap().is_none());
        assert!(watcher.tick().unwrap().is_none());
    }

    #[test]
    fn test_tick_reports_additions_and_removals() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.pdf");
        std::fs::write(&a, b"x").unwrap();

        let mut watcher = watcher_for(temp_dir.path());
        watcher.set_active(true);
        watcher.tick().unwrap();

        std::fs::remove_file(&a).unwrap();
        std::fs::write(temp_dir.path().join("b.pdf"), b"y").unwrap();
        // Hidden entries never show up
        std::fs::write(temp_dir.path().join(".scratch"), b"z").unwrap();

        let changes = watcher.tick().unwrap().unwrap();
        assert_eq!(changes.added, vec![temp_dir.path().join("b.pdf")]);
        assert_eq!(changes.removed, vec![a]);
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn test_set_active_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut watcher = watcher_for(temp_dir.path());

        watcher.set_active(false);
        watcher.set_active(true);
        let handle = watcher.handle().unwrap();
        watcher.set_active(true);
        assert!(!handle.is_cancelled(), "re-activating must keep the same token");

        watcher.set_active(false);
        watcher.set_active(false);
        assert!(handle.is_cancelled());
        assert_eq!(watcher.state(), WatcherState::Inactive);
        assert!(watcher.handle().is_none());
    }

    #[test]
    fn test_handle_deactivates_watcher() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"x").unwrap();
        let mut watcher = watcher_for(temp_dir.path());
        watcher.set_active(true);

        watcher.handle().unwrap().deactivate();
        assert!(!watcher.is_active());
        assert!(watcher.tick().unwrap().is_none());
        assert!(watcher.baseline().is_empty());
    }

    #[test]
    fn test_missing_directory_degrades_to_inactive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("gone");
        std::fs::create_dir(&root).unwrap();

        let mut watcher = watcher_for(&root);
        watcher.set_active(true);
        std::fs::remove_dir(&root).unwrap();

        let err = watcher.tick().unwrap_err();
        assert!(matches!(err, WatchError::Unavailable { .. }));
        assert!(!watcher.is_active());
        assert!(watcher.tick().unwrap().is_none());
    }

    /// Lists the real directory, but deactivates the watcher mid-listing.
    struct DeactivatingFs {
        inner: LocalFilesystem,
        handle: std::sync::Mutex<Option<WatcherHandle>>,
    }

    impl Filesystem for DeactivatingFs {
        fn list(&self, dir: &Path) -> crate::fs::FsResult<Vec<crate::fs::EntryInfo>> {
            let entries = self.inner.list(dir)?;
            if let Some(handle) = self.handle.lock().unwrap().as_ref() {
                handle.deactivate();
            }
            Ok(entries)
        }
        fn stat(&self, path: &Path) -> crate::fs::FsResult<crate::fs::EntryInfo> {
            self.inner.stat(path)
        }
        fn copy(&self, from: &Path, to: &Path) -> crate::fs::FsResult<()> {
            self.inner.copy(from, to)
        }
        fn rename(&self, from: &Path, to: &Path) -> crate::fs::FsResult<()> {
            self.inner.rename(from, to)
        }
        fn remove(&self, path: &Path) -> crate::fs::FsResult<()> {
            self.inner.remove(path)
        }
    }

    #[test]
    fn test_deactivation_during_listing_keeps_baseline() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"x").unwrap();

        let fs = Arc::new(DeactivatingFs {
            inner: LocalFilesystem::new(),
            handle: std::sync::Mutex::new(None),
        });
        let mut watcher = RepositoryWatcher::new(temp_dir.path(), fs.clone());
        watcher.set_active(true);
        *fs.handle.lock().unwrap() = watcher.handle();

        assert!(watcher.tick().unwrap().is_none());
        assert!(watcher.baseline().is_empty());
        assert_eq!(watcher.state(), WatcherState::Inactive);
    }

    #[test]
    fn test_rollback_reports_changes_again() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.pdf"), b"x").unwrap();

        let mut watcher = watcher_for(temp_dir.path());
        watcher.set_active(true);
        watcher.tick().unwrap().unwrap();

        std::fs::write(temp_dir.path().join("b.pdf"), b"y").unwrap();
        let changes = watcher.tick().unwrap().unwrap();
        watcher.rollback();
        assert_eq!(watcher.baseline().len(), 1);

        assert_eq!(watcher.tick().unwrap(), Some(changes));
        watcher.rollback();
        watcher.rollback();
        assert_eq!(watcher.baseline().len(), 1);

        // A silent tick leaves nothing to roll back to
        watcher.tick().unwrap().unwrap();
        assert!(watcher.tick().unwrap().is_none());
        watcher.rollback();
        assert_eq!(watcher.baseline().len(), 2);
    }

    #[test]
    fn test_reset_clears_baseline() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(second.path().join("b.pdf"), b"x").unwrap();

        let mut watcher = watcher_for(first.path());
        watcher.set_active(true);
        watcher.tick().unwrap();

        watcher.reset(second.path());
        assert!(!watcher.is_active());
        assert!(watcher.baseline().is_empty());

        watcher.set_active(true);
        let changes = watcher.tick().unwrap().unwrap();
        assert_eq!(changes.added, vec![second.path().join("b.pdf")]);
        assert!(changes.removed.is_empty());
    }
}
