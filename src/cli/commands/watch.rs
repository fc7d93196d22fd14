//! Watch command: poll the repository until Ctrl-C.

use anyhow::{Context, Result};

use crate::events::RepositoryEvent;
use crate::repository::Repository;

pub async fn run(mut repository: Repository, json: bool) -> Result<()> {
    repository.subscribe(move |event| {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("[watch] cannot serialize event: {e}"),
            }
        } else {
            println!("{}", describe(event));
        }
    });

    let stop = repository
        .watcher_handle()
        .context("Watcher did not start")?;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.deactivate();
        }
    });

    eprintln!(
        "Watching {} every {}ms, Ctrl-C to stop",
        repository.root().display(),
        repository.settings().watcher.poll_interval_ms
    );
    repository.watch().await?;
    Ok(())
}

fn describe(event: &RepositoryEvent) -> String {
    match event {
        RepositoryEvent::Vocabulary(event) => format!("vocabulary changed: {}", event.field()),
        RepositoryEvent::RepositoryUpdated(changes) => format!(
            "changes: {} added, {} removed, {} modified",
            changes.added.len(),
            changes.removed.len(),
            changes.modified.len()
        ),
        RepositoryEvent::CollectionChanged { documents, active } => {
            format!("collection: {documents} documents, {active} active")
        }
        RepositoryEvent::RepositoryUnavailable { path, reason } => {
            format!("repository unavailable at {}: {reason}", path.display())
        }
        RepositoryEvent::RepositorySwitched { path } => format!("switched to {}", path.display()),
    }
}
