//! Per-session consistency state.

use crate::geo::Coordinate;
use crate::poi::PointOfInterest;

/// The last returned destination and where the caller was when it was
/// returned. A single most-recent slot, not a cache: it makes repeat taps
/// from a stationary user idempotent. Cleared only by an explicit
/// "find another" action, never by time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyAnchor {
    pub location: Coordinate,
    pub poi: PointOfInterest,
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub anchor: Option<ConsistencyAnchor>,
    /// Where the last *live* (network) search ran from; drives the
    /// moved-enough check for background cache refreshes.
    pub last_live_search: Option<Coordinate>,
}
