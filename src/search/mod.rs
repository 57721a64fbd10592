//! The tiered search orchestrator.
//!
//! One linear state machine per search request: consistency shortcut →
//! fresh-cache shortcut → tiered live search (with bounded full-sequence
//! retries to absorb provider cold starts) → stale-cache fallback →
//! [`SearchError::NoResultsFound`]. Concurrent searches for different
//! sessions are independent; within one orchestrator a reentrant call while
//! a search is active is a no-op. Cache refreshes and crowd-sync events run
//! detached and are never awaited by the caller.

pub mod error;
pub mod session;
pub mod tiers;

#[cfg(test)]
mod tests;

pub use error::SearchError;
pub use tiers::{SearchTier, default_tiers};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::ResultCache;
use crate::config::Config;
use crate::constants::{
    CONSISTENCY_RADIUS_M, FRESH_CACHE_MAX_AGE_SECS, FRESH_CACHE_RADIUS_M, NOT_A_PLACE_REASON,
    REFRESH_MOVEMENT_THRESHOLD_M,
};
use crate::fanout::QueryFanout;
use crate::flags::{FlagSnapshot, FlagStore};
use crate::geo::{Circle, Coordinate, PoiId};
use crate::poi::{PoiSource, PointOfInterest};
use crate::provider::{Fix, LocationProvider, PlaceSearchProvider};
use crate::ranking;
use crate::reliability::ReliabilityStore;
use crate::sync::{RatingUpdate, RemoteSyncClient, SearchLogEntry, SyncBackend, SyncDisabled, SyncResult};
use session::{ConsistencyAnchor, SessionState};

/// How the orchestrator acquires a location fix.
#[derive(Debug, Clone)]
pub struct LocationPolicy {
    /// Interval between `current_fix` polls while no fix exists.
    pub poll_interval: Duration,
    /// Bounded poll attempts before falling back to a one-shot request.
    pub max_polls: u32,
    /// A fix is good enough below this reported accuracy radius...
    pub good_accuracy_m: f64,
    /// ...and below this age.
    pub max_fix_age: Duration,
    /// Timeout for the single `request_fix` retry.
    pub request_timeout: Duration,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_polls: 10,
            good_accuracy_m: 50.0,
            max_fix_age: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Search-flow tuning. Every field has a production default; tests shrink
/// the tier ladder and zero the delays.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub tiers: Vec<SearchTier>,
    pub consistency_radius_m: f64,
    pub fresh_cache_radius_m: f64,
    pub fresh_cache_max_age: Duration,
    pub refresh_movement_threshold_m: f64,
    /// Total passes over the tier ladder (first attempt + retries).
    pub tier_sequence_attempts: u32,
    /// Pause between tier-sequence passes.
    pub retry_delay: Duration,
    /// Per-query provider timeout inside the fanout.
    pub query_timeout: Duration,
    pub location: LocationPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            consistency_radius_m: CONSISTENCY_RADIUS_M,
            fresh_cache_radius_m: FRESH_CACHE_RADIUS_M,
            fresh_cache_max_age: Duration::from_secs(FRESH_CACHE_MAX_AGE_SECS),
            refresh_movement_threshold_m: REFRESH_MOVEMENT_THRESHOLD_M,
            tier_sequence_attempts: 3,
            retry_delay: Duration::from_millis(400),
            query_timeout: Duration::from_secs(5),
            location: LocationPolicy::default(),
        }
    }
}

/// Where a returned POI came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// Repeat query from (nearly) the same spot: the stored answer, no
    /// network call.
    ConsistencyAnchor,
    /// A fresh cache entry near the caller.
    FreshCache,
    /// Live tiered search, with the winning tier index.
    LiveSearch { tier: usize },
    /// Everything else failed; the closest cache entry regardless of age.
    StaleCacheFallback,
}

/// A successful search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub poi: PointOfInterest,
    pub origin: ResultOrigin,
}

/// Outcome of a search call.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(SearchHit),
    /// A search was already active for this session; the call was a no-op.
    InFlight,
}

impl SearchOutcome {
    pub fn hit(&self) -> Option<&SearchHit> {
        match self {
            SearchOutcome::Found(hit) => Some(hit),
            SearchOutcome::InFlight => None,
        }
    }
}

/// The search brain: wires the provider, location source, stores, and sync
/// backend together and drives the tiered state machine.
pub struct SearchOrchestrator<P, L, S> {
    provider: Arc<P>,
    location: Arc<L>,
    sync: Arc<S>,
    reliability: Arc<ReliabilityStore>,
    cache: Arc<ResultCache>,
    flags: Arc<FlagStore>,
    config: SearchConfig,
    session: Arc<Mutex<SessionState>>,
    /// Bumped by "find another"; detached work started under an older value
    /// discards its results instead of writing them back.
    generation: Arc<AtomicU64>,
    in_flight: AtomicBool,
}

impl<P, L, S> SearchOrchestrator<P, L, S>
where
    P: PlaceSearchProvider,
    L: LocationProvider,
    S: SyncBackend,
{
    pub fn new(
        provider: Arc<P>,
        location: Arc<L>,
        sync: Arc<S>,
        reliability: Arc<ReliabilityStore>,
        cache: Arc<ResultCache>,
        flags: Arc<FlagStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            provider,
            location,
            sync,
            reliability,
            cache,
            flags,
            config,
            session: Arc::new(Mutex::new(SessionState::default())),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Finds the nearest usable POI for the caller's current location.
    #[instrument(skip(self))]
    pub async fn find_nearest(&self) -> Result<SearchOutcome, SearchError> {
        self.search(false).await
    }

    /// Discards the consistency anchor and searches again, bypassing the
    /// anchor and fresh-cache shortcuts so the caller gets a freshly ranked
    /// answer that reflects any feedback just given.
    #[instrument(skip(self))]
    pub async fn find_another(&self) -> Result<SearchOutcome, SearchError> {
        self.reset_session();
        self.search(true).await
    }

    /// Clears the consistency anchor and supersedes any detached work from
    /// earlier searches. In-flight network calls are not cancelled; their
    /// stale results are discarded by the generation check.
    pub fn reset_session(&self) {
        self.session.lock().anchor = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Records user feedback locally and pushes it to the crowd store in a
    /// detached task. Must be called from within a tokio runtime.
    pub fn report_feedback(&self, poi_id: &PoiId, positive: bool, reason: Option<&str>) {
        let not_a_place = reason.is_some_and(|r| r.eq_ignore_ascii_case(NOT_A_PLACE_REASON));
        self.reliability.record_feedback(poi_id, positive, reason);

        let sync = Arc::clone(&self.sync);
        let update = RatingUpdate::from_feedback(poi_id.clone(), positive, not_a_place);
        tokio::spawn(async move {
            if let Err(e) = sync.push_rating(update).await {
                warn!(error = %e, "rating push failed");
            }
        });
    }

    /// Pulls nearby crowd scores and merges them into the local store.
    pub async fn refresh_remote_scores(&self, near: Coordinate) {
        match self.sync.fetch_nearby_ratings(near).await {
            Ok(remote) => self.reliability.merge_remote(remote),
            Err(e) => warn!(error = %e, "nearby ratings pull failed"),
        }
    }

    async fn search(&self, skip_shortcuts: bool) -> Result<SearchOutcome, SearchError> {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            debug!("search already in flight; ignoring reentrant call");
            return Ok(SearchOutcome::InFlight);
        };

        // Flags are snapshotted once so a mid-search remote refresh cannot
        // change this search's behavior.
        let flags = self.flags.snapshot();

        let fix = self.acquire_location().await?;
        let anchor = fix.coordinate;
        debug!(%anchor, accuracy_m = fix.accuracy_m, "location acquired");

        // "Find another" bypasses both shortcuts: the anchor and the fresh
        // cache would each hand back the place the user just rejected.
        if !skip_shortcuts {
            if let Some(poi) = self.consistency_hit(anchor) {
                info!(poi = %poi.name, "consistency anchor hit; returning stored destination");
                return Ok(found(poi, ResultOrigin::ConsistencyAnchor));
            }

            if let Some(entry) = self.cache.freshest(
                anchor,
                self.config.fresh_cache_radius_m,
                self.config.fresh_cache_max_age,
            ) {
                info!(poi = %entry.poi.name, "fresh cache hit");
                let poi = entry.poi.with_source(PoiSource::Cache);
                self.remember(anchor, &poi);
                self.spawn_cache_refresh_if_moved(anchor);
                return Ok(found(poi, ResultOrigin::FreshCache));
            }
        }

        if let Some((tier, ranked)) =
            run_tier_sequence(&*self.provider, &self.reliability, &self.config, anchor).await
        {
            let winner = ranked[0].clone();
            self.remember(anchor, &winner);
            self.session.lock().last_live_search = Some(anchor);
            self.cache.put(&ranked);
            self.spawn_sync_events(anchor, ranked, flags);
            return Ok(found(winner, ResultOrigin::LiveSearch { tier }));
        }

        if let Some(entry) = self.cache.nearest(anchor) {
            warn!(poi = %entry.poi.name, "live search exhausted; serving stale cache entry");
            let poi = entry.poi.with_source(PoiSource::Cache);
            self.remember(anchor, &poi);
            return Ok(found(poi, ResultOrigin::StaleCacheFallback));
        }

        Err(SearchError::NoResultsFound)
    }

    fn consistency_hit(&self, anchor: Coordinate) -> Option<PointOfInterest> {
        let session = self.session.lock();
        let stored = session.anchor.as_ref()?;
        if anchor.distance_m(&stored.location) <= self.config.consistency_radius_m {
            Some(stored.poi.clone())
        } else {
            None
        }
    }

    fn remember(&self, location: Coordinate, poi: &PointOfInterest) {
        self.session.lock().anchor = Some(ConsistencyAnchor {
            location,
            poi: poi.clone(),
        });
    }

    /// Refreshes the cache in the background when the caller has moved
    /// meaningfully since the last live search. Never delays the response
    /// that was already given.
    fn spawn_cache_refresh_if_moved(&self, anchor: Coordinate) {
        let moved = {
            let session = self.session.lock();
            match session.last_live_search {
                Some(last) => {
                    anchor.distance_m(&last) >= self.config.refresh_movement_threshold_m
                }
                None => true,
            }
        };
        if !moved {
            return;
        }

        debug!("caller moved since last live search; refreshing cache in background");
        let provider = Arc::clone(&self.provider);
        let reliability = Arc::clone(&self.reliability);
        let cache = Arc::clone(&self.cache);
        let session = Arc::clone(&self.session);
        let generation = Arc::clone(&self.generation);
        let config = self.config.clone();
        let started_under = generation.load(Ordering::Acquire);

        tokio::spawn(async move {
            if let Some((_, ranked)) =
                run_tier_sequence(&*provider, &reliability, &config, anchor).await
            {
                if generation.load(Ordering::Acquire) != started_under {
                    debug!("background refresh superseded; discarding results");
                    return;
                }
                cache.put(&ranked);
                session.lock().last_live_search = Some(anchor);
            }
        });
    }

    /// Forwards a successful search's results to the crowd store. Detached;
    /// must never block or fail the caller-visible search.
    fn spawn_sync_events(
        &self,
        anchor: Coordinate,
        ranked: Vec<PointOfInterest>,
        flags: FlagSnapshot,
    ) {
        let sync = Arc::clone(&self.sync);
        let reliability = Arc::clone(&self.reliability);
        let flag_store = Arc::clone(&self.flags);

        tokio::spawn(async move {
            if let Err(e) = sync.push_discovered(ranked.clone()).await {
                warn!(error = %e, "discovered-POI push failed");
            }

            if flags.log_raw_searches {
                let entry = SearchLogEntry {
                    anchor,
                    results: ranked,
                    at: Utc::now(),
                };
                if let Err(e) = sync.push_search_log(entry).await {
                    warn!(error = %e, "search-log push failed");
                }
            }

            match sync.fetch_nearby_ratings(anchor).await {
                Ok(remote) => reliability.merge_remote(remote),
                Err(e) => warn!(error = %e, "nearby ratings pull failed"),
            }

            match sync.fetch_feature_flags().await {
                Ok(snapshot) => flag_store.update(snapshot),
                Err(e) => debug!(error = %e, "feature-flag refresh failed; keeping cached snapshot"),
            }
        });
    }

    /// Acquires a usable fix: bounded polling while no fix exists, then one
    /// bounded request for a better fix if the best seen is poor, then
    /// proceed with whatever is available.
    async fn acquire_location(&self) -> Result<Fix, SearchError> {
        let policy = &self.config.location;
        let mut best: Option<Fix> = None;

        for attempt in 0..policy.max_polls {
            if let Some(fix) = self.location.current_fix().await {
                best = Some(fix);
                break;
            }
            if attempt + 1 < policy.max_polls {
                tokio::time::sleep(policy.poll_interval).await;
            }
        }

        if let Some(ref fix) = best {
            if fix_is_good(fix, policy) {
                return Ok(*fix);
            }
        }

        if let Some(fresh) = self.location.request_fix(policy.request_timeout).await {
            if fix_is_good(&fresh, policy) {
                return Ok(fresh);
            }
            best = Some(match best {
                Some(prev) if prev.accuracy_m <= fresh.accuracy_m => prev,
                _ => fresh,
            });
        }

        match best {
            Some(fix) => {
                debug!(accuracy_m = fix.accuracy_m, "proceeding with best-effort fix");
                Ok(fix)
            }
            None => Err(SearchError::LocationUnavailable),
        }
    }
}

impl<P, L> SearchOrchestrator<P, L, RemoteSyncClient>
where
    P: PlaceSearchProvider,
    L: LocationProvider,
{
    /// Wires persistent stores and the HTTP sync client from `config`.
    /// Fails if no sync base URL is configured.
    pub fn with_remote_sync(
        provider: Arc<P>,
        location: Arc<L>,
        config: &Config,
    ) -> SyncResult<Self> {
        let base_url = config.sync_base_url.as_deref().unwrap_or_default();
        let sync = Arc::new(RemoteSyncClient::new(base_url, config.sync_timeout)?);

        Ok(Self::new(
            provider,
            location,
            sync,
            Arc::new(ReliabilityStore::open(&config.storage_path)),
            Arc::new(ResultCache::open(&config.storage_path, config.cache_capacity)),
            Arc::new(FlagStore::open(&config.storage_path)),
            search_config_from(config),
        ))
    }
}

impl<P, L> SearchOrchestrator<P, L, SyncDisabled>
where
    P: PlaceSearchProvider,
    L: LocationProvider,
{
    /// Wires persistent stores with remote sync disabled.
    pub fn without_sync(provider: Arc<P>, location: Arc<L>, config: &Config) -> Self {
        Self::new(
            provider,
            location,
            Arc::new(SyncDisabled),
            Arc::new(ReliabilityStore::open(&config.storage_path)),
            Arc::new(ResultCache::open(&config.storage_path, config.cache_capacity)),
            Arc::new(FlagStore::open(&config.storage_path)),
            search_config_from(config),
        )
    }
}

impl<P, L, S> std::fmt::Debug for SearchOrchestrator<P, L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("tiers", &self.config.tiers.len())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

fn search_config_from(config: &Config) -> SearchConfig {
    SearchConfig {
        query_timeout: config.provider_timeout,
        ..SearchConfig::default()
    }
}

fn found(poi: PointOfInterest, origin: ResultOrigin) -> SearchOutcome {
    SearchOutcome::Found(SearchHit { poi, origin })
}

fn fix_is_good(fix: &Fix, policy: &LocationPolicy) -> bool {
    fix.accuracy_m < policy.good_accuracy_m && fix.age < policy.max_fix_age
}

/// Runs the full tier ladder, bottom to top, with bounded whole-sequence
/// retries to absorb the provider's cold-start emptiness. Returns the
/// winning tier index and its ranked candidate list.
async fn run_tier_sequence<P: PlaceSearchProvider>(
    provider: &P,
    reliability: &ReliabilityStore,
    config: &SearchConfig,
    anchor: Coordinate,
) -> Option<(usize, Vec<PointOfInterest>)> {
    let fanout = QueryFanout::new(config.query_timeout);

    for attempt in 0..config.tier_sequence_attempts {
        if attempt > 0 {
            debug!(attempt, "retrying full tier sequence");
            tokio::time::sleep(config.retry_delay).await;
        }

        for (index, tier) in config.tiers.iter().enumerate() {
            let region = Circle::new(anchor, tier.radius_m);
            let raw = fanout.search(provider, &tier.queries, region).await;
            if raw.is_empty() {
                debug!(tier = index, "tier produced no raw results");
                continue;
            }

            let candidates = ranking::dedupe(raw, anchor);
            let usable = ranking::filter(candidates, anchor, tier.radius_m, reliability);
            if usable.is_empty() {
                debug!(tier = index, "tier produced no usable candidates");
                continue;
            }

            let ranked = ranking::rank(usable, anchor, reliability);
            info!(tier = index, candidates = ranked.len(), "tier search succeeded");
            return Some((index, ranked));
        }
    }

    None
}

/// RAII guard for the one-search-per-session rule.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
