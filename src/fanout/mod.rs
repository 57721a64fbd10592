//! Concurrent query fanout for one search tier.
//!
//! One provider call per query string, all launched together. A per-query
//! failure or timeout contributes zero results instead of failing the batch,
//! and the merged set only becomes visible once every launched query has
//! settled. The fanout is stateless and retry-free; tier-level retries are
//! the orchestrator's job.

#[cfg(test)]
mod tests;

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, instrument, warn};

use crate::geo::Circle;
use crate::poi::{PoiSource, PointOfInterest};
use crate::provider::PlaceSearchProvider;

/// Fans one tier's query list out to the provider.
#[derive(Debug, Clone, Copy)]
pub struct QueryFanout {
    per_query_timeout: Duration,
}

impl QueryFanout {
    pub fn new(per_query_timeout: Duration) -> Self {
        Self { per_query_timeout }
    }

    /// Runs every query concurrently and merges the surviving results.
    ///
    /// Merge order follows the query list, not completion order; the
    /// contractually deterministic order only exists after ranking.
    #[instrument(skip(self, provider, queries), fields(query_count = queries.len(), radius_m = region.radius_m))]
    pub async fn search<P: PlaceSearchProvider>(
        &self,
        provider: &P,
        queries: &[String],
        region: Circle,
    ) -> Vec<PointOfInterest> {
        let lookups = queries.iter().map(|query| async move {
            match tokio::time::timeout(self.per_query_timeout, provider.query(query, region)).await
            {
                Ok(Ok(places)) => {
                    debug!(query = %query, results = places.len(), "query settled");
                    places
                        .iter()
                        .map(|raw| PointOfInterest::from_raw(raw, PoiSource::LiveSearch))
                        .collect()
                }
                Ok(Err(e)) => {
                    warn!(query = %query, error = %e, "provider query failed");
                    Vec::new()
                }
                Err(_) => {
                    warn!(query = %query, timeout_ms = self.per_query_timeout.as_millis() as u64, "provider query timed out");
                    Vec::new()
                }
            }
        });

        let merged: Vec<PointOfInterest> = join_all(lookups).await.into_iter().flatten().collect();
        debug!(merged = merged.len(), "fanout complete");
        merged
    }
}
