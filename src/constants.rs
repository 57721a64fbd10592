//! Cross-cutting tuning constants.
//!
//! Prefer deriving secondary values from primary ones to avoid drift. Most of
//! these are distance or score thresholds shared between the ranking, cache,
//! and reliability modules; the search-flow knobs live on
//! [`SearchConfig`](crate::search::SearchConfig) so tests can override them.

/// Two POIs closer than this are treated as the same physical place.
pub const DEDUP_RADIUS_M: f64 = 50.0;

/// Distances within one band width of each other are ranked as ties.
/// Absorbs GPS jitter.
pub const RANK_BAND_M: f64 = 10.0;

/// Repeat queries from within this radius of the last answer return the
/// identical destination.
pub const CONSISTENCY_RADIUS_M: f64 = 30.0;

/// A cache entry within this radius may satisfy a search without a live call.
pub const FRESH_CACHE_RADIUS_M: f64 = 500.0;

/// Cache entries older than this are never served as fresh.
pub const FRESH_CACHE_MAX_AGE_SECS: u64 = 30 * 60;

/// Cache entries older than this are purged on load.
pub const CACHE_PURGE_HORIZON_SECS: u64 = 24 * 60 * 60;

/// Maximum number of persisted cache entries (oldest evicted first).
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Movement since the last live search that triggers a background refresh.
pub const REFRESH_MOVEMENT_THRESHOLD_M: f64 = 100.0;

/// Score assigned to a POI on its first feedback event.
pub const SCORE_INITIAL: f64 = 50.0;

/// Retention factor applied to the old score on every feedback event.
pub const SCORE_DECAY: f64 = 0.95;

/// Score delta for an upvote.
pub const SCORE_UPVOTE_DELTA: f64 = 10.0;

/// Score delta for a downvote.
pub const SCORE_DOWNVOTE_DELTA: f64 = -20.0;

/// Score clamp bounds used for ranking and display. The stored score itself
/// is unbounded.
pub const SCORE_CLAMP_MIN: f64 = -100.0;
pub const SCORE_CLAMP_MAX: f64 = 150.0;

/// A POI is hidden when its score falls below this threshold...
pub const HIDE_SCORE_THRESHOLD: f64 = -20.0;

/// ...but only once it has accumulated at least this much feedback. A single
/// bad rating must not hide a place.
pub const HIDE_MIN_FEEDBACK: u64 = 5;

/// "Not a place" reports required to permanently blacklist a POI.
pub const NOT_A_PLACE_BLACKLIST_THRESHOLD: u32 = 2;

/// Feedback reason string that marks a POI as not actually existing.
pub const NOT_A_PLACE_REASON: &str = "not a place";

/// Trailing window for recent-feedback counters.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Recent negative count that marks a POI as uncertain.
pub const NEGATIVE_SPIKE_THRESHOLD: u64 = 3;

/// The uncertain flag clears once recent positives outweigh recent negatives
/// by more than this factor.
pub const UNCERTAIN_CLEAR_RATIO: f64 = 2.0;

/// Bound on the distance-equivalent ranking nudge derived from the score.
pub const RANKING_ADJUSTMENT_BOUND_M: f64 = 50.0;

/// Extra distance penalty applied to uncertain POIs.
pub const UNCERTAIN_PENALTY_M: f64 = 25.0;

/// Feedback log caps. Recent-window counters are recomputed from this log.
pub const FEEDBACK_LOG_MAX_EVENTS: usize = 1_000;
pub const FEEDBACK_LOG_MAX_AGE_DAYS: i64 = 90;

/// Reputation-based filtering never reduces the candidate set to this size
/// or below.
pub const MIN_CANDIDATES_AFTER_REPUTATION_FILTER: usize = 3;
