//! Recording sync backend for tests.

use parking_lot::Mutex;

use super::{RatingUpdate, SearchLogEntry, SyncBackend, SyncError, SyncResult};
use crate::flags::FlagSnapshot;
use crate::geo::Coordinate;
use crate::poi::PointOfInterest;
use crate::reliability::RemoteRating;

/// In-memory [`SyncBackend`] that records every push and serves scripted
/// pull responses. A failure switch makes every call error, for exercising
/// the best-effort paths.
#[derive(Default)]
pub struct MockSyncBackend {
    ratings: Mutex<Vec<RatingUpdate>>,
    discovered: Mutex<Vec<Vec<PointOfInterest>>>,
    search_logs: Mutex<Vec<SearchLogEntry>>,
    nearby_ratings: Mutex<Vec<RemoteRating>>,
    flags: Mutex<FlagSnapshot>,
    failing: Mutex<bool>,
}

impl MockSyncBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Scripts the response to `fetch_nearby_ratings`.
    pub fn script_nearby_ratings(&self, ratings: Vec<RemoteRating>) {
        *self.nearby_ratings.lock() = ratings;
    }

    /// Scripts the response to `fetch_feature_flags`.
    pub fn script_flags(&self, flags: FlagSnapshot) {
        *self.flags.lock() = flags;
    }

    pub fn pushed_ratings(&self) -> Vec<RatingUpdate> {
        self.ratings.lock().clone()
    }

    /// Each `push_discovered` batch, in call order.
    pub fn discovered_batches(&self) -> Vec<Vec<PointOfInterest>> {
        self.discovered.lock().clone()
    }

    pub fn search_logs(&self) -> Vec<SearchLogEntry> {
        self.search_logs.lock().clone()
    }

    fn check(&self) -> SyncResult<()> {
        if *self.failing.lock() {
            // A reqwest::Error cannot be fabricated; the URL variant stands
            // in for any transport failure in tests.
            return Err(SyncError::InvalidBaseUrl {
                value: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}

impl SyncBackend for MockSyncBackend {
    async fn push_rating(&self, update: RatingUpdate) -> SyncResult<()> {
        self.check()?;
        self.ratings.lock().push(update);
        Ok(())
    }

    async fn fetch_nearby_ratings(&self, _near: Coordinate) -> SyncResult<Vec<RemoteRating>> {
        self.check()?;
        Ok(self.nearby_ratings.lock().clone())
    }

    async fn push_discovered(&self, pois: Vec<PointOfInterest>) -> SyncResult<()> {
        self.check()?;
        self.discovered.lock().push(pois);
        Ok(())
    }

    async fn push_search_log(&self, entry: SearchLogEntry) -> SyncResult<()> {
        self.check()?;
        self.search_logs.lock().push(entry);
        Ok(())
    }

    async fn fetch_feature_flags(&self) -> SyncResult<FlagSnapshot> {
        self.check()?;
        Ok(*self.flags.lock())
    }
}
