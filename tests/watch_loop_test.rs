//! Polling loop behaviour: change detection, cancellation and degradation.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docname::fs::{EntryInfo, FsError, FsResult};
use docname::{Filesystem, LocalFilesystem, Repository, RepositoryError, RepositoryEvent, Settings, WatchError};
use tempfile::TempDir;

/// Local filesystem whose n-th next `list` call fails once.
#[derive(Default)]
struct FlakyFs {
    inner: LocalFilesystem,
    fail_in: AtomicUsize,
}

impl FlakyFs {
    fn fail_list_call(&self, n: usize) {
        self.fail_in.store(n, Ordering::SeqCst);
    }
}

impl Filesystem for FlakyFs {
    fn list(&self, dir: &Path) -> FsResult<Vec<EntryInfo>> {
        let remaining = self.fail_in.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_in.store(remaining - 1, Ordering::SeqCst);
            if remaining == 1 {
                return Err(FsError::NotFound {
                    path: dir.join("vanished.tmp"),
                });
            }
        }
        self.inner.list(dir)
    }

    fn stat(&self, path: &Path) -> FsResult<EntryInfo> {
        self.inner.stat(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.inner.copy(from, to)
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        self.inner.rename(from, to)
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        self.inner.remove(path)
    }
}

fn fast_settings() -> Arc<Settings> {
    let mut settings = Settings::default();
    settings.watcher.poll_interval_ms = 20;
    Arc::new(settings)
}

fn record(repository: &mut Repository) -> Arc<Mutex<Vec<RepositoryEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    repository.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

#[test]
fn test_poll_reports_once_per_change() {
    let repo_dir = TempDir::new().unwrap();
    fs::write(repo_dir.path().join("20240105-ES-HR-ACME-INV-rent-ME.pdf"), b"x").unwrap();

    let mut repository = Repository::open(repo_dir.path(), fast_settings()).unwrap();
    assert!(repository.is_watching());

    // Empty baseline: the first poll reports the existing files once
    let first = repository.poll().unwrap().unwrap();
    assert_eq!(first.added.len(), 1);
    assert!(repository.poll().unwrap().is_none());
    assert!(repository.poll().unwrap().is_none());

    fs::write(repo_dir.path().join("20240106-ES-HR-ACME-INV-fuel-ME.pdf"), b"y").unwrap();
    let events = record(&mut repository);
    let changes = repository.poll().unwrap().unwrap();
    assert_eq!(changes.added.len(), 1);
    assert_eq!(repository.index().len(), 2);

    let events = events.lock().unwrap();
    assert!(matches!(events[0], RepositoryEvent::RepositoryUpdated(_)));
    assert_eq!(
        events[1],
        RepositoryEvent::CollectionChanged {
            documents: 2,
            active: 0
        }
    );
}

#[test]
fn test_malformed_drop_is_healed_on_poll() {
    let repo_dir = TempDir::new().unwrap();
    let mut repository = Repository::open(repo_dir.path(), fast_settings()).unwrap();
    assert!(repository.poll().unwrap().is_none());

    fs::write(repo_dir.path().join("Scan 0001.PDF"), b"x").unwrap();
    repository.poll().unwrap().unwrap();

    assert!(repository.index().get("-----Scan_0001-.pdf").is_some());
    assert!(repo_dir.path().join("-----Scan_0001-.pdf").exists());
    assert!(!repo_dir.path().join("Scan 0001.PDF").exists());
}

#[test]
fn test_failed_rescan_reports_changes_on_next_poll() {
    let repo_dir = TempDir::new().unwrap();
    let fs_provider = Arc::new(FlakyFs::default());
    let mut repository = Repository::open_with(repo_dir.path(), fast_settings(), fs_provider.clone()).unwrap();
    assert!(repository.poll().unwrap().is_none());
    let events = record(&mut repository);

    fs::write(repo_dir.path().join("20240105-ES-HR-ACME-INV-rent-ME.pdf"), b"x").unwrap();

    // The watcher's listing succeeds, the rescan's listing fails
    fs_provider.fail_list_call(2);
    assert!(matches!(repository.poll(), Err(RepositoryError::Fs(_))));
    assert!(repository.is_watching());
    assert!(repository.index().is_empty());
    assert!(events.lock().unwrap().is_empty());

    let changes = repository.poll().unwrap().expect("change is reported again");
    assert_eq!(changes.added.len(), 1);
    assert_eq!(repository.index().len(), 1);
    assert!(repository.poll().unwrap().is_none());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], RepositoryEvent::RepositoryUpdated(_)));
    assert!(matches!(events[1], RepositoryEvent::CollectionChanged { documents: 1, .. }));
}

#[test]
fn test_collection_changed_only_after_successful_rescan() {
    let repo_dir = TempDir::new().unwrap();
    let inbox = TempDir::new().unwrap();
    let source = inbox.path().join("report.pdf");
    fs::write(&source, b"x").unwrap();

    let fs_provider = Arc::new(FlakyFs::default());
    let mut repository = Repository::open_with(repo_dir.path(), fast_settings(), fs_provider.clone()).unwrap();
    let events = record(&mut repository);

    fs_provider.fail_list_call(1);
    assert!(repository.import(&source).is_err());
    assert!(events.lock().unwrap().is_empty());

    // The copy went through; a later command's rescan picks it up
    assert!(repository.index().is_empty());
    repository.delete("missing.pdf").unwrap_err();
    assert!(repository.index().get("-----report-.pdf").is_some());
    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![RepositoryEvent::CollectionChanged {
            documents: 1,
            active: 0
        }]
    );
}

#[test]
fn test_unavailable_repository_deactivates_watcher() {
    let parent = TempDir::new().unwrap();
    let root = parent.path().join("papers");
    fs::create_dir(&root).unwrap();

    let mut repository = Repository::open(&root, fast_settings()).unwrap();
    let events = record(&mut repository);
    fs::remove_dir_all(&root).unwrap();

    let err = repository.poll().unwrap_err();
    assert!(matches!(err, RepositoryError::Watch(WatchError::Unavailable { .. })));
    assert!(!repository.is_watching());
    assert!(repository.poll().unwrap().is_none());

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], RepositoryEvent::RepositoryUnavailable { .. }));
}

#[tokio::test]
async fn test_watch_stops_when_handle_deactivates() {
    let repo_dir = TempDir::new().unwrap();
    let mut repository = Repository::open(repo_dir.path(), fast_settings()).unwrap();
    let events = record(&mut repository);
    let handle = repository.watcher_handle().unwrap();

    let writer_dir = repo_dir.path().to_path_buf();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        fs::write(writer_dir.join("20240105-ES-HR-ACME-INV-rent-ME.pdf"), b"x").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.deactivate();
    });

    tokio::time::timeout(Duration::from_secs(5), repository.watch())
        .await
        .expect("watch loop should stop after deactivation")
        .unwrap();
    stopper.await.unwrap();

    assert!(!repository.is_watching());
    assert_eq!(repository.index().len(), 1);
    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|event| matches!(event, RepositoryEvent::RepositoryUpdated(changes) if changes.added.len() == 1)));
}

#[tokio::test]
async fn test_watch_returns_immediately_when_inactive() {
    let repo_dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.watcher.enabled = false;
    let mut repository = Repository::open(repo_dir.path(), Arc::new(settings)).unwrap();

    tokio::time::timeout(Duration::from_secs(1), repository.watch())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_watch_ends_with_error_when_repository_vanishes() {
    let parent = TempDir::new().unwrap();
    let root = parent.path().join("papers");
    fs::create_dir(&root).unwrap();
    let mut repository = Repository::open(&root, fast_settings()).unwrap();

    fs::remove_dir_all(&root).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), repository.watch())
        .await
        .unwrap();
    assert!(matches!(result, Err(RepositoryError::Watch(_))));
}
