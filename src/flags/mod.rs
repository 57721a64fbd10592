//! Remotely-configured feature flags with safe local defaults.
//!
//! Flags gate optional instrumentation only, never core search behavior.
//! The orchestrator takes an immutable [`FlagSnapshot`] at the start of each
//! search so a mid-search remote refresh cannot change what that search
//! does. If the remote fetch has never succeeded, every flag defaults to its
//! conservative value (`false`).


use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store;

/// Snapshot file name under the configured storage directory.
pub const FLAGS_SNAPSHOT_FILENAME: &str = "feature_flags.json";

/// Immutable per-search view of the feature flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSnapshot {
    /// Forward each raw search's POI set to the search-log endpoint.
    pub log_raw_searches: bool,
}

/// Cached flag store. Remote refreshes overwrite the cache; reads always
/// succeed from the last known (or default) snapshot.
pub struct FlagStore {
    path: Option<PathBuf>,
    current: Mutex<FlagSnapshot>,
}

impl FlagStore {
    pub fn new_in_memory() -> Self {
        Self {
            path: None,
            current: Mutex::new(FlagSnapshot::default()),
        }
    }

    /// Opens the store, loading the last cached snapshot if one exists.
    pub fn open(storage_dir: &std::path::Path) -> Self {
        let path = storage_dir.join(FLAGS_SNAPSHOT_FILENAME);
        let current = store::load_snapshot_best_effort(&path).unwrap_or_default();
        Self {
            path: Some(path),
            current: Mutex::new(current),
        }
    }

    /// The flags as currently cached.
    pub fn snapshot(&self) -> FlagSnapshot {
        *self.current.lock()
    }

    /// Replaces the cache with a freshly fetched snapshot.
    pub fn update(&self, snapshot: FlagSnapshot) {
        let mut current = self.current.lock();
        if *current != snapshot {
            debug!(?snapshot, "feature flags updated");
        }
        *current = snapshot;
        if let Some(ref path) = self.path {
            store::save_snapshot_best_effort(path, &*current);
        }
    }
}

impl std::fmt::Debug for FlagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagStore")
            .field("current", &self.snapshot())
            .field("persisted", &self.path.is_some())
            .finish()
    }
}
