//! HTTP implementation of the crowd-aggregation API.

use std::time::Duration;

use tracing::debug;

use super::{RatingUpdate, SearchLogEntry, SyncBackend, SyncError, SyncResult};
use crate::flags::FlagSnapshot;
use crate::geo::Coordinate;
use crate::poi::PointOfInterest;
use crate::reliability::RemoteRating;

/// Reqwest-backed [`SyncBackend`].
///
/// Every call carries the configured request timeout. No retry logic here;
/// callers treat all of this as best-effort.
#[derive(Debug, Clone)]
pub struct RemoteSyncClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteSyncClient {
    /// Builds a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SyncError::InvalidBaseUrl {
                value: base_url.to_string(),
            });
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl SyncBackend for RemoteSyncClient {
    async fn push_rating(&self, update: RatingUpdate) -> SyncResult<()> {
        debug!(poi_id = %update.poi_id, "pushing rating update");
        self.http
            .post(self.url("/ratings"))
            .json(&update)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_nearby_ratings(&self, near: Coordinate) -> SyncResult<Vec<RemoteRating>> {
        let ratings = self
            .http
            .get(self.url("/ratings"))
            .query(&[("near", format!("{},{}", near.lat, near.lon))])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ratings)
    }

    async fn push_discovered(&self, pois: Vec<PointOfInterest>) -> SyncResult<()> {
        debug!(count = pois.len(), "pushing discovered POIs");
        self.http
            .post(self.url("/discovered-pois"))
            .json(&pois)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn push_search_log(&self, entry: SearchLogEntry) -> SyncResult<()> {
        self.http
            .post(self.url("/search-log"))
            .json(&entry)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_feature_flags(&self) -> SyncResult<FlagSnapshot> {
        let flags = self
            .http
            .get(self.url("/feature-flags"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(flags)
    }
}
