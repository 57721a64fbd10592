//! Crowd-sourced reliability scoring.
//!
//! Every feedback event updates an exponentially-decayed trust score:
//! `new = old × 0.95 + (+10 | −20)`. Old signal fades at 5% per event so
//! recent reports dominate. Two "not a place" reports blacklist a POI
//! permanently, regardless of score. Recent-window counters are recomputed
//! from a capped feedback log rather than stored, so the trailing 7-day view
//! stays correct across restarts.
//!
//! All operations are local and infallible; snapshot persistence is
//! best-effort and never corrupts in-memory state.


use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{
    FEEDBACK_LOG_MAX_AGE_DAYS, FEEDBACK_LOG_MAX_EVENTS, HIDE_MIN_FEEDBACK, HIDE_SCORE_THRESHOLD,
    NEGATIVE_SPIKE_THRESHOLD, NOT_A_PLACE_BLACKLIST_THRESHOLD, NOT_A_PLACE_REASON,
    RANKING_ADJUSTMENT_BOUND_M, RECENT_WINDOW_DAYS, SCORE_CLAMP_MAX, SCORE_CLAMP_MIN, SCORE_DECAY,
    SCORE_DOWNVOTE_DELTA, SCORE_INITIAL, SCORE_UPVOTE_DELTA, UNCERTAIN_CLEAR_RATIO,
    UNCERTAIN_PENALTY_M,
};
use crate::geo::PoiId;
use crate::store;

/// Snapshot file name under the configured storage directory.
pub const RELIABILITY_SNAPSHOT_FILENAME: &str = "reliability.json";

/// Per-POI reliability record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityRecord {
    /// Decayed trust score. Unbounded here; clamped to [-100, +150] when
    /// used for ranking.
    pub score: f64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub not_a_place_reports: u32,
    /// One-way flag. Once set it is never cleared, no matter how much
    /// positive feedback follows.
    pub blacklisted: bool,
    /// Set while a recent negative spike is active; clears once recent
    /// positives outweigh recent negatives by more than 2×.
    pub uncertain: bool,
}

impl Default for ReliabilityRecord {
    fn default() -> Self {
        Self {
            score: SCORE_INITIAL,
            upvotes: 0,
            downvotes: 0,
            not_a_place_reports: 0,
            blacklisted: false,
            uncertain: false,
        }
    }
}

impl ReliabilityRecord {
    pub fn total_feedback(&self) -> u64 {
        self.upvotes + self.downvotes
    }
}

/// A reliability record as pulled from the crowd-aggregation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRating {
    pub poi_id: PoiId,
    pub score: f64,
    pub upvotes: u64,
    pub downvotes: u64,
    pub not_a_place_reports: u32,
    pub blacklisted: bool,
}

/// One crowd feedback event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub poi_id: PoiId,
    pub positive: bool,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReliabilityState {
    records: HashMap<PoiId, ReliabilityRecord>,
    /// Capped to the last 1,000 events / 90 days; recent-window counters are
    /// recomputed from it.
    log: VecDeque<FeedbackEvent>,
}

/// Shared, mutex-guarded reliability store.
pub struct ReliabilityStore {
    path: Option<PathBuf>,
    state: Mutex<ReliabilityState>,
}

impl ReliabilityStore {
    /// An unpersisted store (tests, ephemeral sessions).
    pub fn new_in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(ReliabilityState::default()),
        }
    }

    /// Opens the store backed by a snapshot under `storage_dir`, loading any
    /// previous state best-effort.
    pub fn open(storage_dir: &std::path::Path) -> Self {
        let path = storage_dir.join(RELIABILITY_SNAPSHOT_FILENAME);
        let mut state: ReliabilityState =
            store::load_snapshot_best_effort(&path).unwrap_or_default();
        prune_log(&mut state.log, Utc::now());
        info!(records = state.records.len(), events = state.log.len(), "reliability store loaded");
        Self {
            path: Some(path),
            state: Mutex::new(state),
        }
    }

    /// Records one feedback event and applies the decay formula.
    pub fn record_feedback(&self, poi_id: &PoiId, positive: bool, reason: Option<&str>) {
        let now = Utc::now();
        let mut state = self.state.lock();

        state.log.push_back(FeedbackEvent {
            poi_id: poi_id.clone(),
            positive,
            reason: reason.map(str::to_string),
            at: now,
        });
        prune_log(&mut state.log, now);

        let (recent_pos, recent_neg) = recent_counts(&state.log, poi_id, now);

        let record = state.records.entry(poi_id.clone()).or_default();
        let delta = if positive { SCORE_UPVOTE_DELTA } else { SCORE_DOWNVOTE_DELTA };
        record.score = record.score * SCORE_DECAY + delta;

        if positive {
            record.upvotes += 1;
        } else {
            record.downvotes += 1;
        }

        if reason.is_some_and(|r| r.eq_ignore_ascii_case(NOT_A_PLACE_REASON)) {
            record.not_a_place_reports += 1;
            if record.not_a_place_reports >= NOT_A_PLACE_BLACKLIST_THRESHOLD && !record.blacklisted
            {
                record.blacklisted = true;
                info!(poi_id = %poi_id, "POI blacklisted after repeated not-a-place reports");
            }
        }

        if recent_pos as f64 > recent_neg as f64 * UNCERTAIN_CLEAR_RATIO {
            record.uncertain = false;
        } else if recent_neg >= NEGATIVE_SPIKE_THRESHOLD {
            record.uncertain = true;
        }

        debug!(poi_id = %poi_id, score = record.score, positive, "feedback recorded");
        self.persist(&state);
    }

    /// `true` while the trailing-7-day negative count is at the spike
    /// threshold.
    pub fn recent_negative_spike(&self, poi_id: &PoiId) -> bool {
        let state = self.state.lock();
        let (_, recent_neg) = recent_counts(&state.log, poi_id, Utc::now());
        recent_neg >= NEGATIVE_SPIKE_THRESHOLD
    }

    /// `true` if the POI must be excluded: blacklisted, or a strongly
    /// negative score backed by a feedback pattern (never a single rating).
    pub fn should_hide(&self, poi_id: &PoiId) -> bool {
        let state = self.state.lock();
        match state.records.get(poi_id) {
            Some(record) => {
                record.blacklisted
                    || (record.score < HIDE_SCORE_THRESHOLD
                        && record.total_feedback() >= HIDE_MIN_FEEDBACK)
            }
            None => false,
        }
    }

    /// Maps the score to a bounded distance-equivalent nudge in meters.
    ///
    /// Positive values are a bonus (the POI ranks as if closer), negative a
    /// penalty. Centered on the neutral score of 50, bounded to ±50 m, with
    /// an extra penalty while the POI is uncertain. A ranking nudge only;
    /// hard exclusion goes through [`should_hide`](Self::should_hide).
    pub fn ranking_adjustment(&self, poi_id: &PoiId) -> f64 {
        let state = self.state.lock();
        let Some(record) = state.records.get(poi_id) else {
            return 0.0;
        };

        let clamped = record.score.clamp(SCORE_CLAMP_MIN, SCORE_CLAMP_MAX);
        let mut adjustment = (clamped - SCORE_INITIAL) * 0.5;
        if record.uncertain {
            adjustment -= UNCERTAIN_PENALTY_M;
        }
        adjustment.clamp(-RANKING_ADJUSTMENT_BOUND_M, RANKING_ADJUSTMENT_BOUND_M)
    }

    /// Merges records pulled from the remote store. A remote record is
    /// adopted only when it carries strictly more total feedback than the
    /// local one; the blacklist flag is merged monotonically (a merge can
    /// set it, never clear it).
    pub fn merge_remote(&self, remote: Vec<RemoteRating>) {
        let mut state = self.state.lock();
        let mut adopted = 0usize;

        for rating in remote {
            let local = state.records.entry(rating.poi_id.clone()).or_default();
            let local_total = local.total_feedback();
            let local_was_blacklisted = local.blacklisted;

            if rating.upvotes + rating.downvotes > local_total {
                *local = ReliabilityRecord {
                    score: rating.score,
                    upvotes: rating.upvotes,
                    downvotes: rating.downvotes,
                    not_a_place_reports: rating.not_a_place_reports,
                    blacklisted: rating.blacklisted || local_was_blacklisted,
                    uncertain: local.uncertain,
                };
                adopted += 1;
            } else if rating.blacklisted && !local.blacklisted {
                local.blacklisted = true;
            }
        }

        if adopted > 0 {
            debug!(adopted, "remote reliability records merged");
            self.persist(&state);
        }
    }

    /// Returns a copy of the record, if one exists.
    pub fn record(&self, poi_id: &PoiId) -> Option<ReliabilityRecord> {
        self.state.lock().records.get(poi_id).cloned()
    }

    pub fn is_blacklisted(&self, poi_id: &PoiId) -> bool {
        self.state
            .lock()
            .records
            .get(poi_id)
            .is_some_and(|r| r.blacklisted)
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    fn persist(&self, state: &ReliabilityState) {
        if let Some(ref path) = self.path {
            store::save_snapshot_best_effort(path, state);
        }
    }
}

impl std::fmt::Debug for ReliabilityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReliabilityStore")
            .field("records", &self.len())
            .field("persisted", &self.path.is_some())
            .finish()
    }
}

fn recent_counts(log: &VecDeque<FeedbackEvent>, poi_id: &PoiId, now: DateTime<Utc>) -> (u64, u64) {
    let cutoff = now - ChronoDuration::days(RECENT_WINDOW_DAYS);
    let mut pos = 0;
    let mut neg = 0;
    for event in log.iter().filter(|e| &e.poi_id == poi_id && e.at >= cutoff) {
        if event.positive {
            pos += 1;
        } else {
            neg += 1;
        }
    }
    (pos, neg)
}

fn prune_log(log: &mut VecDeque<FeedbackEvent>, now: DateTime<Utc>) {
    let cutoff = now - ChronoDuration::days(FEEDBACK_LOG_MAX_AGE_DAYS);
    while let Some(front) = log.front() {
        if front.at < cutoff || log.len() > FEEDBACK_LOG_MAX_EVENTS {
            log.pop_front();
        } else {
            break;
        }
    }
}
