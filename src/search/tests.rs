use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use super::*;
use crate::cache::ResultCache;
use crate::flags::{FlagSnapshot, FlagStore};
use crate::geo::{Coordinate, PoiId};
use crate::poi::{PoiSource, PointOfInterest, RawPlace};
use crate::provider::{Fix, MockLocationProvider, MockPlaceProvider};
use crate::reliability::{ReliabilityStore, RemoteRating};
use crate::sync::MockSyncBackend;

const ANCHOR: Coordinate = Coordinate {
    lat: 51.5007,
    lon: -0.1246,
};

const DEG_PER_M: f64 = 1.0 / 111_320.0;

fn north_of(base: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(base.lat + meters * DEG_PER_M, base.lon)
}

fn place(name: &str, at: Coordinate) -> RawPlace {
    RawPlace {
        name: name.to_string(),
        lat: at.lat,
        lon: at.lon,
        category: None,
        address: None,
    }
}

fn fast_config() -> SearchConfig {
    SearchConfig {
        retry_delay: Duration::ZERO,
        location: LocationPolicy {
            poll_interval: Duration::ZERO,
            ..LocationPolicy::default()
        },
        ..SearchConfig::default()
    }
}

struct Fixture {
    provider: Arc<MockPlaceProvider>,
    location: Arc<MockLocationProvider>,
    sync: Arc<MockSyncBackend>,
    reliability: Arc<ReliabilityStore>,
    cache: Arc<ResultCache>,
    flags: Arc<FlagStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            provider: Arc::new(MockPlaceProvider::new()),
            location: Arc::new(MockLocationProvider::with_fix(ANCHOR)),
            sync: Arc::new(MockSyncBackend::new()),
            reliability: Arc::new(ReliabilityStore::new_in_memory()),
            cache: Arc::new(ResultCache::new_in_memory(50)),
            flags: Arc::new(FlagStore::new_in_memory()),
        }
    }

    fn orchestrator(
        &self,
        config: SearchConfig,
    ) -> SearchOrchestrator<MockPlaceProvider, MockLocationProvider, MockSyncBackend> {
        SearchOrchestrator::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.location),
            Arc::clone(&self.sync),
            Arc::clone(&self.reliability),
            Arc::clone(&self.cache),
            Arc::clone(&self.flags),
            config,
        )
    }
}

async fn settle() {
    // Lets detached tasks spawned by the search run to completion.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn first_tier_live_search_returns_closest_result() {
    let fx = Fixture::new();
    fx.provider
        .script("public toilet", vec![place("Victoria Public Toilet", north_of(ANCHOR, 60.0))]);
    let search = fx.orchestrator(fast_config());

    let outcome = search.find_nearest().await.unwrap();
    let hit = outcome.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::LiveSearch { tier: 0 });
    assert_eq!(hit.poi.name, "Victoria Public Toilet");
    assert_eq!(hit.poi.source, PoiSource::LiveSearch);
    assert_eq!(fx.cache.len(), 1);
}

#[tokio::test]
async fn repeat_search_from_same_spot_reuses_the_anchor() {
    let fx = Fixture::new();
    fx.provider
        .script("public toilet", vec![place("Station Toilets", north_of(ANCHOR, 40.0))]);
    let search = fx.orchestrator(fast_config());

    let first = search.find_nearest().await.unwrap();
    let calls_after_first = fx.provider.total_calls();

    // Still within the 30 m consistency radius.
    fx.location.set_steady(Some(Fix {
        coordinate: north_of(ANCHOR, 10.0),
        accuracy_m: 10.0,
        age: Duration::from_secs(1),
    }));
    let second = search.find_nearest().await.unwrap();

    assert_eq!(second.hit().unwrap().origin, ResultOrigin::ConsistencyAnchor);
    assert_eq!(second.hit().unwrap().poi, first.hit().unwrap().poi);
    assert_eq!(fx.provider.total_calls(), calls_after_first);
}

#[tokio::test]
async fn nearby_move_is_served_from_the_fresh_cache() {
    let fx = Fixture::new();
    fx.provider
        .script("public toilet", vec![place("Embankment Toilets", north_of(ANCHOR, 50.0))]);
    let search = fx.orchestrator(fast_config());

    search.find_nearest().await.unwrap();
    let calls_after_first = fx.provider.total_calls();

    // 50 m: past the consistency radius, below the refresh threshold.
    fx.location.set_steady(Some(Fix {
        coordinate: north_of(ANCHOR, 50.0),
        accuracy_m: 10.0,
        age: Duration::from_secs(1),
    }));
    let outcome = search.find_nearest().await.unwrap();
    let hit = outcome.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::FreshCache);
    assert_eq!(hit.poi.source, PoiSource::Cache);
    settle().await;
    assert_eq!(fx.provider.total_calls(), calls_after_first);
}

#[tokio::test]
async fn larger_move_refreshes_the_cache_in_the_background() {
    let fx = Fixture::new();
    fx.provider
        .script("public toilet", vec![place("Embankment Toilets", north_of(ANCHOR, 50.0))]);
    let search = fx.orchestrator(fast_config());

    search.find_nearest().await.unwrap();
    let calls_after_first = fx.provider.total_calls();

    // 200 m: still inside the 500 m cache radius, past the 100 m
    // movement threshold.
    fx.location.set_steady(Some(Fix {
        coordinate: north_of(ANCHOR, 200.0),
        accuracy_m: 10.0,
        age: Duration::from_secs(1),
    }));
    let outcome = search.find_nearest().await.unwrap();

    assert_eq!(outcome.hit().unwrap().origin, ResultOrigin::FreshCache);
    settle().await;
    assert!(fx.provider.total_calls() > calls_after_first);
}

#[tokio::test]
async fn empty_close_tiers_escalate_to_the_wider_radius() {
    let fx = Fixture::new();
    fx.provider
        .script("train station", vec![place("Riverside Station", north_of(ANCHOR, 800.0))]);
    let search = fx.orchestrator(fast_config());

    let outcome = search.find_nearest().await.unwrap();
    let hit = outcome.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::LiveSearch { tier: 1 });
    assert_eq!(hit.poi.name, "Riverside Station");

    let calls = fx.provider.calls();
    assert_eq!(calls.len(), 10);
    assert!(calls[..3].iter().all(|(_, r)| *r == 300.0));
    assert!(calls[3..].iter().all(|(_, r)| *r == 1_000.0));
}

#[tokio::test]
async fn cold_provider_is_absorbed_by_sequence_retries() {
    let fx = Fixture::new();
    fx.provider.script_sequence("toilet", vec![vec![], vec![]]);
    fx.provider
        .script("toilet", vec![place("Pier Head Toilets", north_of(ANCHOR, 30.0))]);

    let config = SearchConfig {
        tiers: vec![SearchTier::new(300.0, &["toilet"])],
        ..fast_config()
    };
    let search = fx.orchestrator(config);

    let outcome = search.find_nearest().await.unwrap();

    assert_eq!(outcome.hit().unwrap().origin, ResultOrigin::LiveSearch { tier: 0 });
    assert_eq!(fx.provider.query_count("toilet"), 3);
}

#[tokio::test]
async fn exhausted_search_falls_back_to_any_cached_entry() {
    let fx = Fixture::new();
    // Outside the 500 m fresh radius, so only the last-resort path can
    // serve it.
    let distant = PointOfInterest::from_raw(
        &place("Harbour Toilets", north_of(ANCHOR, 2_000.0)),
        PoiSource::LiveSearch,
    );
    fx.cache.put(std::slice::from_ref(&distant));
    let search = fx.orchestrator(fast_config());

    let outcome = search.find_nearest().await.unwrap();
    let hit = outcome.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::StaleCacheFallback);
    assert_eq!(hit.poi.name, "Harbour Toilets");
    assert_eq!(hit.poi.source, PoiSource::Cache);
}

#[tokio::test]
async fn no_results_and_no_cache_is_an_error() {
    let fx = Fixture::new();
    let search = fx.orchestrator(fast_config());

    assert_eq!(search.find_nearest().await, Err(SearchError::NoResultsFound));
}

#[tokio::test]
async fn missing_location_is_reported_not_defaulted() {
    let fx = Fixture::new();
    fx.location.set_steady(None);
    let search = fx.orchestrator(fast_config());

    assert_eq!(
        search.find_nearest().await,
        Err(SearchError::LocationUnavailable)
    );
    assert_eq!(fx.location.current_fix_calls(), 10);
    assert_eq!(fx.location.request_fix_calls(), 1);
}

#[tokio::test]
async fn poor_fix_triggers_a_single_fresh_request() {
    let fx = Fixture::new();
    fx.location.set_steady(Some(Fix {
        coordinate: ANCHOR,
        accuracy_m: 120.0,
        age: Duration::from_secs(1),
    }));
    fx.location.set_requested(Some(Fix {
        coordinate: ANCHOR,
        accuracy_m: 8.0,
        age: Duration::from_secs(0),
    }));
    fx.provider
        .script("public toilet", vec![place("Castle Toilets", north_of(ANCHOR, 20.0))]);
    let search = fx.orchestrator(fast_config());

    search.find_nearest().await.unwrap();

    assert_eq!(fx.location.current_fix_calls(), 1);
    assert_eq!(fx.location.request_fix_calls(), 1);
}

#[tokio::test]
async fn find_another_discards_the_anchor_and_searches_again() {
    let fx = Fixture::new();
    fx.provider
        .script("public toilet", vec![place("Quayside Toilets", north_of(ANCHOR, 40.0))]);
    let search = fx.orchestrator(fast_config());

    search.find_nearest().await.unwrap();
    let calls_after_first = fx.provider.total_calls();

    let again = search.find_another().await.unwrap();

    assert_eq!(again.hit().unwrap().origin, ResultOrigin::LiveSearch { tier: 0 });
    assert!(fx.provider.total_calls() > calls_after_first);
}

#[tokio::test]
async fn feedback_is_recorded_locally_and_pushed_to_sync() {
    let fx = Fixture::new();
    let search = fx.orchestrator(fast_config());
    let id = PoiId::from_coordinate(&ANCHOR);

    search.report_feedback(&id, false, Some("not a place"));
    search.report_feedback(&id, false, Some("not a place"));
    settle().await;

    assert!(fx.reliability.is_blacklisted(&id));
    let pushed = fx.sync.pushed_ratings();
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[0].delta_downvote, 1);
    assert!(pushed[0].not_a_place_report);
}

#[tokio::test]
async fn live_search_pushes_discoveries_and_merges_remote_ratings() {
    let fx = Fixture::new();
    fx.provider
        .script("public toilet", vec![place("Market Toilets", north_of(ANCHOR, 40.0))]);

    let banned = PoiId::from_coordinate(&north_of(ANCHOR, 900.0));
    fx.sync.script_nearby_ratings(vec![RemoteRating {
        poi_id: banned.clone(),
        score: -80.0,
        upvotes: 0,
        downvotes: 12,
        not_a_place_reports: 3,
        blacklisted: true,
    }]);

    let search = fx.orchestrator(fast_config());
    search.find_nearest().await.unwrap();
    settle().await;

    assert_eq!(fx.sync.discovered_batches().len(), 1);
    assert!(fx.reliability.is_blacklisted(&banned));
    // Raw search logging stays off until the flag says otherwise.
    assert!(fx.sync.search_logs().is_empty());
}

#[tokio::test]
async fn search_logging_follows_the_feature_flag() {
    let fx = Fixture::new();
    fx.flags.update(FlagSnapshot {
        log_raw_searches: true,
    });
    fx.provider
        .script("public toilet", vec![place("Abbey Toilets", north_of(ANCHOR, 40.0))]);

    let search = fx.orchestrator(fast_config());
    search.find_nearest().await.unwrap();
    settle().await;

    let logs = fx.sync.search_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].results.len(), 1);
}

#[tokio::test]
async fn sync_failures_never_fail_the_search() {
    let fx = Fixture::new();
    fx.sync.set_failing(true);
    fx.provider
        .script("public toilet", vec![place("Old Town Toilets", north_of(ANCHOR, 40.0))]);

    let search = fx.orchestrator(fast_config());
    let outcome = search.find_nearest().await.unwrap();
    settle().await;

    assert!(outcome.hit().is_some());
    assert!(fx.sync.discovered_batches().is_empty());
}

#[test]
fn flight_guard_is_exclusive_and_releases_on_drop() {
    let flag = AtomicBool::new(false);

    let first = FlightGuard::acquire(&flag);
    assert!(first.is_some());
    assert!(FlightGuard::acquire(&flag).is_none());

    drop(first);
    assert!(FlightGuard::acquire(&flag).is_some());
}

#[test]
fn default_tiers_widen_monotonically() {
    let tiers = default_tiers();
    assert_eq!(tiers.len(), 3);
    for pair in tiers.windows(2) {
        assert!(pair[0].radius_m < pair[1].radius_m);
        assert!(pair[0].queries.len() < pair[1].queries.len());
    }
}
