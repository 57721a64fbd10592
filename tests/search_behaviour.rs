//! End-to-end behavior of the search pipeline through the public API.

use std::sync::Arc;
use std::time::Duration;

use poifinder::{
    Config, Coordinate, Fix, FlagStore, LocationPolicy, MockLocationProvider, MockPlaceProvider,
    MockSyncBackend, PoiSource, RawPlace, ReliabilityStore, ResultCache, ResultOrigin,
    SearchConfig, SearchOrchestrator, default_tiers,
};

const ANCHOR: Coordinate = Coordinate {
    lat: 51.5007,
    lon: -0.1246,
};

const DEG_PER_M: f64 = 1.0 / 111_320.0;

fn north_of(meters: f64) -> Coordinate {
    Coordinate::new(ANCHOR.lat + meters * DEG_PER_M, ANCHOR.lon)
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

fn in_memory_orchestrator(
    provider: Arc<MockPlaceProvider>,
    location: Arc<MockLocationProvider>,
    reliability: Arc<ReliabilityStore>,
) -> SearchOrchestrator<MockPlaceProvider, MockLocationProvider, MockSyncBackend> {
    SearchOrchestrator::new(
        provider,
        location,
        Arc::new(MockSyncBackend::new()),
        reliability,
        Arc::new(ResultCache::new_in_memory(50)),
        Arc::new(FlagStore::new_in_memory()),
        fast_config(),
    )
}

#[tokio::test]
async fn free_toilet_wins_over_a_paid_cafe_at_the_same_spot() {
    let provider = Arc::new(MockPlaceProvider::new());
    // Same physical corner, 5 m apart: the cafe expects a purchase, the
    // public toilet does not.
    provider.script(
        "public toilet",
        vec![
            place("Corner Cafe", north_of(40.0)),
            place("High Street Public Toilet", north_of(45.0)),
        ],
    );
    let search = in_memory_orchestrator(
        provider,
        Arc::new(MockLocationProvider::with_fix(ANCHOR)),
        Arc::new(ReliabilityStore::new_in_memory()),
    );

    let outcome = search.find_nearest().await.unwrap();
    let hit = outcome.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::LiveSearch { tier: 0 });
    assert_eq!(hit.poi.name, "High Street Public Toilet");
}

#[tokio::test]
async fn repeated_bad_feedback_demotes_a_place_on_the_next_search() {
    let provider = Arc::new(MockPlaceProvider::new());
    // Spaced > 50 m apart so none of them merge as duplicates.
    provider.script(
        "public toilet",
        vec![
            place("Park Toilets", north_of(10.0)),
            place("Garden Toilets", north_of(70.0)),
            place("Museum Toilets", north_of(130.0)),
            place("Harbour Toilets", north_of(190.0)),
            place("Station Toilets", north_of(250.0)),
        ],
    );
    let reliability = Arc::new(ReliabilityStore::new_in_memory());
    let search = in_memory_orchestrator(
        Arc::clone(&provider),
        Arc::new(MockLocationProvider::with_fix(ANCHOR)),
        Arc::clone(&reliability),
    );

    let first = search.find_nearest().await.unwrap();
    let loser = first.hit().unwrap().poi.clone();
    assert_eq!(loser.name, "Park Toilets");

    for _ in 0..5 {
        search.report_feedback(&loser.id, false, Some("locked"));
    }

    let second = search.find_another().await.unwrap();
    let hit = second.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::LiveSearch { tier: 0 });
    assert_eq!(hit.poi.name, "Garden Toilets");
}

#[tokio::test]
async fn provider_outage_degrades_to_the_stale_cache() {
    let provider = Arc::new(MockPlaceProvider::new());
    provider.script(
        "public toilet",
        vec![place("Old Market Toilets", north_of(40.0))],
    );
    let location = Arc::new(MockLocationProvider::with_fix(ANCHOR));
    let search = in_memory_orchestrator(
        Arc::clone(&provider),
        Arc::clone(&location),
        Arc::new(ReliabilityStore::new_in_memory()),
    );

    let first = search.find_nearest().await.unwrap();
    assert_eq!(first.hit().unwrap().origin, ResultOrigin::LiveSearch { tier: 0 });

    // The provider goes dark; the caller moves out of fresh-cache range.
    for tier in default_tiers() {
        for query in &tier.queries {
            provider.fail_query(query, "upstream outage");
        }
    }
    location.set_steady(Some(Fix {
        coordinate: north_of(2_000.0),
        accuracy_m: 10.0,
        age: Duration::from_secs(1),
    }));

    let fallback = search.find_nearest().await.unwrap();
    let hit = fallback.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::StaleCacheFallback);
    assert_eq!(hit.poi.name, "Old Market Toilets");
    assert_eq!(hit.poi.source, PoiSource::Cache);
}

#[tokio::test]
async fn cached_results_survive_a_restart() {
    let storage = tempfile::tempdir().unwrap();
    let config = Config {
        storage_path: storage.path().to_path_buf(),
        ..Config::default()
    };
    config.validate().unwrap();

    let provider = Arc::new(MockPlaceProvider::new());
    provider.script(
        "public toilet",
        vec![place("Terminus Toilets", north_of(40.0))],
    );

    {
        let search = SearchOrchestrator::without_sync(
            Arc::clone(&provider),
            Arc::new(MockLocationProvider::with_fix(ANCHOR)),
            &config,
        );
        search.find_nearest().await.unwrap();
    }

    // Fresh process, dead provider: the persisted cache must still answer.
    let offline = Arc::new(MockPlaceProvider::new());
    for tier in default_tiers() {
        for query in &tier.queries {
            offline.fail_query(query, "no network");
        }
    }
    let search = SearchOrchestrator::without_sync(
        offline,
        Arc::new(MockLocationProvider::with_fix(ANCHOR)),
        &config,
    );

    let outcome = search.find_nearest().await.unwrap();
    let hit = outcome.hit().unwrap();

    assert_eq!(hit.origin, ResultOrigin::FreshCache);
    assert_eq!(hit.poi.name, "Terminus Toilets");
}
