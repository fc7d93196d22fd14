//! Poll-based repository watcher.
//!
//! ```text
//! INACTIVE --set_active(true)--> ACTIVE --tick--> ACTIVE
//!    ^                              |
//!    +------ set_active(false) -----+
//!    +------ listing failure -------+
//! ```
//!
//! Polling is used instead of OS change notifications so behaviour is the
//! same on every platform and on network mounts.

mod error;
mod poller;
mod snapshot;

pub use error::WatchError;
pub use poller::{RepositoryWatcher, WatcherHandle, WatcherState};
pub use snapshot::{ChangeSet, RepositorySnapshot};
