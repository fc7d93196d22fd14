//! Typed event bus for repository notifications.
//!
//! Listeners are plain callbacks. Every event is delivered synchronously to
//! all current listeners in registration order. A listener must not emit on
//! the same bus.

use std::path::PathBuf;

use serde::Serialize;

use crate::vocabulary::VocabularyEvent;
use crate::watcher::ChangeSet;

/// Everything a repository reports to its observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RepositoryEvent {
    /// A vocabulary catalog was written.
    Vocabulary(VocabularyEvent),
    /// The watcher saw files appear, disappear or change.
    RepositoryUpdated(ChangeSet),
    /// The document collection was rebuilt.
    CollectionChanged { documents: usize, active: usize },
    /// The repository directory could not be read; polling has stopped.
    RepositoryUnavailable { path: PathBuf, reason: String },
    RepositorySwitched { path: PathBuf },
}

pub type Listener = Box<dyn FnMut(&RepositoryEvent) + Send>;

/// Identifies a registered listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&RepositoryEvent) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the listener was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &RepositoryEvent) {
        crate::debug_event!("events", "emit", "{event:?} to {} listeners", self.listeners.len());
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
