//! Deduplication, filtering, and deterministic ranking of search results.
//!
//! The fanout's merge order is arbitrary; everything contractually ordered
//! happens here. All three passes are pure over their inputs (the
//! reliability store is only read), so ranking the same candidate set twice
//! yields the same order.


use std::cmp::Ordering;

use crate::constants::{DEDUP_RADIUS_M, MIN_CANDIDATES_AFTER_REPUTATION_FILTER, RANK_BAND_M};
use crate::geo::Coordinate;
use crate::poi::{Category, PointOfInterest, is_large_retail_brand};
use crate::reliability::ReliabilityStore;

/// Merges near-duplicate POIs (within 50 m) into a single candidate.
///
/// Candidates are walked in ascending distance from `anchor` (name-tiebroken
/// for determinism). A candidate within the dedup radius of already-kept
/// entries is the same physical place as all of them: if any of those is
/// free-access the candidate merges away; if the candidate alone is free it
/// supersedes the closest match and absorbs the rest. The output never
/// contains two entries within the radius of each other.
pub fn dedupe(pois: Vec<PointOfInterest>, anchor: Coordinate) -> Vec<PointOfInterest> {
    let mut sorted = pois;
    sorted.sort_by(|a, b| {
        anchor
            .distance_m(&a.coordinate)
            .total_cmp(&anchor.distance_m(&b.coordinate))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut kept: Vec<PointOfInterest> = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        let matched: Vec<usize> = kept
            .iter()
            .enumerate()
            .filter(|(_, e)| e.coordinate.distance_m(&candidate.coordinate) <= DEDUP_RADIUS_M)
            .map(|(i, _)| i)
            .collect();

        if matched.is_empty() {
            kept.push(candidate);
        } else if candidate.is_free_access() && matched.iter().all(|&i| !kept[i].is_free_access())
        {
            kept[matched[0]] = candidate;
            for &i in matched[1..].iter().rev() {
                kept.remove(i);
            }
        }
    }
    kept
}

/// Drops unusable candidates: too far, bare fuel kiosks, and (while more
/// than three alternatives survive) POIs the reliability store hides.
///
/// Reputation never filters the list down past the survivor floor: a
/// suppressed place is still better than no answer at all.
pub fn filter(
    pois: Vec<PointOfInterest>,
    anchor: Coordinate,
    max_distance_m: f64,
    reliability: &ReliabilityStore,
) -> Vec<PointOfInterest> {
    let usable: Vec<PointOfInterest> = pois
        .into_iter()
        .filter(|poi| anchor.distance_m(&poi.coordinate) <= max_distance_m)
        .filter(|poi| poi.category != Category::FuelKiosk || is_large_retail_brand(&poi.name))
        .collect();

    let retained: Vec<PointOfInterest> = usable
        .iter()
        .filter(|poi| !reliability.should_hide(&poi.id))
        .cloned()
        .collect();

    if retained.len() > MIN_CANDIDATES_AFTER_REPUTATION_FILTER {
        retained
    } else {
        usable
    }
}

/// Deterministic total order over candidates.
///
/// Keys, in order: distance from `anchor` (nudged by the reliability
/// adjustment, then banded to 10 m so GPS jitter cannot flip ranks),
/// dedicated facilities before incidental venues, name, latitude, longitude.
pub fn rank(
    pois: Vec<PointOfInterest>,
    anchor: Coordinate,
    reliability: &ReliabilityStore,
) -> Vec<PointOfInterest> {
    let mut keyed: Vec<(RankKey, PointOfInterest)> = pois
        .into_iter()
        .map(|poi| {
            let raw = anchor.distance_m(&poi.coordinate);
            let effective = (raw - reliability.ranking_adjustment(&poi.id)).max(0.0);
            let key = RankKey {
                band: (effective / RANK_BAND_M).floor() as i64,
                dedicated: poi.is_dedicated_facility(),
            };
            (key, poi)
        })
        .collect();

    keyed.sort_by(|(ka, a), (kb, b)| {
        ka.band
            .cmp(&kb.band)
            .then_with(|| kb.dedicated.cmp(&ka.dedicated))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| compare_coordinates(&a.coordinate, &b.coordinate))
    });

    keyed.into_iter().map(|(_, poi)| poi).collect()
}

#[derive(Debug, Clone, Copy)]
struct RankKey {
    band: i64,
    dedicated: bool,
}

fn compare_coordinates(a: &Coordinate, b: &Coordinate) -> Ordering {
    a.lat.total_cmp(&b.lat).then_with(|| a.lon.total_cmp(&b.lon))
}
