//! Freshness- and distance-gated cache of previously seen POIs.
//!
//! Serves instant answers for repeat searches near a known place and acts as
//! the fallback of last resort when live search comes up empty. Entries
//! persist across restarts; anything past the 24 h horizon is purged lazily
//! on load. Merging reuses the ranking module's 50 m same-place rule so the
//! cache never accumulates near-duplicates.


use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{CACHE_PURGE_HORIZON_SECS, DEDUP_RADIUS_M};
use crate::geo::Coordinate;
use crate::poi::PointOfInterest;
use crate::store;

/// Snapshot file name under the configured storage directory.
pub const CACHE_SNAPSHOT_FILENAME: &str = "poi_cache.json";

/// A cached POI and the moment it was captured from a live search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub poi: PointOfInterest,
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry age relative to now.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// `true` while the entry may be served as a fresh result.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.age() < max_age
    }
}

/// Shared, mutex-guarded, persisted result cache.
pub struct ResultCache {
    path: Option<PathBuf>,
    capacity: usize,
    entries: Mutex<Vec<CacheEntry>>,
}

impl ResultCache {
    /// An unpersisted cache (tests, ephemeral sessions).
    pub fn new_in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            capacity,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Opens the cache backed by a snapshot under `storage_dir`, purging
    /// entries beyond the absolute horizon.
    pub fn open(storage_dir: &std::path::Path, capacity: usize) -> Self {
        let path = storage_dir.join(CACHE_SNAPSHOT_FILENAME);
        let mut entries: Vec<CacheEntry> =
            store::load_snapshot_best_effort(&path).unwrap_or_default();

        let horizon = Utc::now() - ChronoDuration::seconds(CACHE_PURGE_HORIZON_SECS as i64);
        let before = entries.len();
        entries.retain(|e| e.captured_at >= horizon);
        if entries.len() < before {
            debug!(purged = before - entries.len(), "expired cache entries purged on load");
        }
        info!(entries = entries.len(), "result cache loaded");

        Self {
            path: Some(path),
            capacity,
            entries: Mutex::new(entries),
        }
    }

    /// Merges freshly discovered POIs into the cache.
    ///
    /// A POI within 50 m of an existing entry refreshes that entry instead of
    /// adding a new one (free-access wins the merge). Oldest entries are
    /// evicted once the cache exceeds capacity.
    pub fn put(&self, pois: &[PointOfInterest]) {
        let now = Utc::now();
        let mut entries = self.entries.lock();

        'pois: for poi in pois {
            for entry in entries.iter_mut() {
                if entry.poi.coordinate.distance_m(&poi.coordinate) <= DEDUP_RADIUS_M {
                    if poi.is_free_access() || !entry.poi.is_free_access() {
                        entry.poi = poi.clone();
                    }
                    entry.captured_at = now;
                    continue 'pois;
                }
            }
            entries.push(CacheEntry {
                poi: poi.clone(),
                captured_at: now,
            });
        }

        while entries.len() > self.capacity {
            if let Some(oldest) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.captured_at)
                .map(|(i, _)| i)
            {
                entries.remove(oldest);
            }
        }

        self.persist(&entries);
    }

    /// Returns the closest entry within `radius_m` of `anchor` whose age is
    /// below `max_age`.
    pub fn freshest(&self, anchor: Coordinate, radius_m: f64, max_age: Duration) -> Option<CacheEntry> {
        let entries = self.entries.lock();
        entries
            .iter()
            .filter(|e| e.is_fresh(max_age))
            .filter(|e| anchor.distance_m(&e.poi.coordinate) <= radius_m)
            .min_by(|a, b| {
                anchor
                    .distance_m(&a.poi.coordinate)
                    .total_cmp(&anchor.distance_m(&b.poi.coordinate))
            })
            .cloned()
    }

    /// Returns the closest entry regardless of age. Last-resort fallback
    /// only.
    pub fn nearest(&self, anchor: Coordinate) -> Option<CacheEntry> {
        let entries = self.entries.lock();
        entries
            .iter()
            .min_by(|a, b| {
                anchor
                    .distance_m(&a.poi.coordinate)
                    .total_cmp(&anchor.distance_m(&b.poi.coordinate))
            })
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        self.persist(&entries);
    }

    fn persist(&self, entries: &Vec<CacheEntry>) {
        if let Some(ref path) = self.path {
            store::save_snapshot_best_effort(path, entries);
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
