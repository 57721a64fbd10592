//! Best-effort crowd-aggregation sync.
//!
//! Everything here is fire-and-forget from the search path's perspective:
//! discovered POIs and feedback events are pushed, remote trust scores and
//! feature flags are pulled, and any failure is logged once. No retry
//! loops, no backoff storms, nothing surfaced to search callers.

pub mod client;
pub mod error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::RemoteSyncClient;
pub use error::{SyncError, SyncResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockSyncBackend;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flags::FlagSnapshot;
use crate::geo::{Coordinate, PoiId};
use crate::poi::PointOfInterest;
use crate::reliability::RemoteRating;

/// A single feedback delta for the ratings endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub poi_id: PoiId,
    pub delta_upvote: u32,
    pub delta_downvote: u32,
    pub not_a_place_report: bool,
}

impl RatingUpdate {
    /// Builds the update for one local feedback event.
    pub fn from_feedback(poi_id: PoiId, positive: bool, not_a_place: bool) -> Self {
        Self {
            poi_id,
            delta_upvote: positive as u32,
            delta_downvote: !positive as u32,
            not_a_place_report: not_a_place,
        }
    }
}

/// One raw search's POI set, pushed for observation only when the
/// corresponding feature flag is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLogEntry {
    pub anchor: Coordinate,
    pub results: Vec<PointOfInterest>,
    pub at: DateTime<Utc>,
}

/// The crowd-aggregation API surface.
///
/// Implemented over HTTP by [`RemoteSyncClient`], recorded in memory by
/// [`MockSyncBackend`], and disabled entirely by [`SyncDisabled`].
pub trait SyncBackend: Send + Sync + 'static {
    /// `POST /ratings`: upsert one feedback delta.
    fn push_rating(&self, update: RatingUpdate) -> impl Future<Output = SyncResult<()>> + Send;

    /// `GET /ratings?near=lat,lon`: pull nearby crowd scores.
    fn fetch_nearby_ratings(
        &self,
        near: Coordinate,
    ) -> impl Future<Output = SyncResult<Vec<RemoteRating>>> + Send;

    /// `POST /discovered-pois`: upsert discovered POIs (the server keeps
    /// the incrementing discovery counter).
    fn push_discovered(
        &self,
        pois: Vec<PointOfInterest>,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// `POST /search-log`: fire-and-forget observational logging.
    fn push_search_log(&self, entry: SearchLogEntry) -> impl Future<Output = SyncResult<()>> + Send;

    /// `GET /feature-flags`.
    fn fetch_feature_flags(&self) -> impl Future<Output = SyncResult<FlagSnapshot>> + Send;
}

/// Backend used when no sync endpoint is configured. Pushes vanish, pulls
/// return nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncDisabled;

impl SyncBackend for SyncDisabled {
    async fn push_rating(&self, _update: RatingUpdate) -> SyncResult<()> {
        Ok(())
    }

    async fn fetch_nearby_ratings(&self, _near: Coordinate) -> SyncResult<Vec<RemoteRating>> {
        Ok(Vec::new())
    }

    async fn push_discovered(&self, _pois: Vec<PointOfInterest>) -> SyncResult<()> {
        Ok(())
    }

    async fn push_search_log(&self, _entry: SearchLogEntry) -> SyncResult<()> {
        Ok(())
    }

    async fn fetch_feature_flags(&self) -> SyncResult<FlagSnapshot> {
        Ok(FlagSnapshot::default())
    }
}
