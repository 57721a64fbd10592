use std::time::Duration;

use super::*;
use crate::geo::{Circle, Coordinate};
use crate::poi::RawPlace;
use crate::provider::MockPlaceProvider;

fn region() -> Circle {
    Circle::new(Coordinate::new(51.5007, -0.1246), 300.0)
}

fn place(name: &str, lat: f64, lon: f64) -> RawPlace {
    RawPlace {
        name: name.to_string(),
        lat,
        lon,
        category: None,
        address: None,
    }
}

fn queries(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn merges_results_from_all_queries() {
    let provider = MockPlaceProvider::new();
    provider.script("public toilet", vec![place("Toilet A", 51.5008, -0.1246)]);
    provider.script("train station", vec![place("Victoria Station", 51.4952, -0.1441)]);

    let fanout = QueryFanout::new(Duration::from_secs(1));
    let merged = fanout
        .search(&provider, &queries(&["public toilet", "train station"]), region())
        .await;

    assert_eq!(merged.len(), 2);
    assert_eq!(provider.total_calls(), 2);
}

#[tokio::test]
async fn failed_query_contributes_zero_results_without_failing_the_batch() {
    let provider = MockPlaceProvider::new();
    provider.script("public toilet", vec![place("Toilet A", 51.5008, -0.1246)]);
    provider.fail_query("train station", "connection reset");

    let fanout = QueryFanout::new(Duration::from_secs(1));
    let merged = fanout
        .search(&provider, &queries(&["public toilet", "train station"]), region())
        .await;

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].name, "Toilet A");
}

#[tokio::test]
async fn empty_responses_yield_an_empty_merge() {
    let provider = MockPlaceProvider::new();

    let fanout = QueryFanout::new(Duration::from_secs(1));
    let merged = fanout
        .search(&provider, &queries(&["public toilet", "cafe"]), region())
        .await;

    assert!(merged.is_empty());
    assert_eq!(provider.total_calls(), 2);
}

#[tokio::test]
async fn results_are_tagged_as_live_search() {
    let provider = MockPlaceProvider::new();
    provider.script("public toilet", vec![place("Toilet A", 51.5008, -0.1246)]);

    let fanout = QueryFanout::new(Duration::from_secs(1));
    let merged = fanout.search(&provider, &queries(&["public toilet"]), region()).await;

    assert_eq!(merged[0].source, crate::poi::PoiSource::LiveSearch);
}

#[tokio::test]
async fn fanout_is_stateless_across_calls() {
    let provider = MockPlaceProvider::new();
    provider.script_sequence("public toilet", vec![vec![], vec![place("Toilet A", 51.5008, -0.1246)]]);

    let fanout = QueryFanout::new(Duration::from_secs(1));
    // Cold first call: empty. The fanout itself does not retry.
    let first = fanout.search(&provider, &queries(&["public toilet"]), region()).await;
    assert!(first.is_empty());

    let second = fanout.search(&provider, &queries(&["public toilet"]), region()).await;
    assert_eq!(second.len(), 1);
}
