use thiserror::Error;

/// The only errors that cross the search boundary.
///
/// Everything else (provider failures, sync failures, persistence failures)
/// is absorbed with best-effort degradation: a plausible answer, even a
/// stale cached one, beats surfacing an internal failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    /// No location fix was obtainable within bounded retries. Never
    /// silently substituted with a stale or default coordinate.
    #[error("no location fix available")]
    LocationUnavailable,

    /// All tiers and retries are exhausted and no cache fallback exists.
    #[error("no results found within the maximum search radius")]
    NoResultsFound,
}
