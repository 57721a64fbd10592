//! poifinder — nearest-usable-POI search with crowd-sourced reliability.
//!
//! The crate answers one question: "where is the nearest place I can
//! actually use, right now?" It fans a tiered set of free-text queries out
//! to a pluggable place-search provider, deduplicates and deterministically
//! ranks the results, nudges the ranking with decayed crowd feedback
//! scores, and degrades through a freshness-gated cache when the network
//! does not cooperate. Crowd sync is strictly best-effort and never blocks
//! a search.
//!
//! Entry point: [`SearchOrchestrator`], generic over a
//! [`PlaceSearchProvider`], a [`LocationProvider`], and a [`SyncBackend`].
//! Scripted mocks for all three seams ship behind the `mock` feature.

pub mod cache;
pub mod config;
pub mod constants;
pub mod fanout;
pub mod flags;
pub mod geo;
pub mod poi;
pub mod provider;
pub mod ranking;
pub mod reliability;
pub mod search;
pub mod store;
pub mod sync;

pub use cache::{CacheEntry, ResultCache};
pub use config::{Config, ConfigError};
pub use fanout::QueryFanout;
pub use flags::{FlagSnapshot, FlagStore};
pub use geo::{Circle, Coordinate, PoiId};
pub use poi::{Category, PoiSource, PointOfInterest, RawPlace};
pub use provider::{Fix, LocationProvider, PlaceSearchProvider, ProviderError};
pub use reliability::{FeedbackEvent, ReliabilityRecord, ReliabilityStore, RemoteRating};
pub use search::{
    LocationPolicy, ResultOrigin, SearchConfig, SearchError, SearchHit, SearchOrchestrator,
    SearchOutcome, SearchTier, default_tiers,
};
pub use sync::{
    RatingUpdate, RemoteSyncClient, SearchLogEntry, SyncBackend, SyncDisabled, SyncError,
};

#[cfg(feature = "mock")]
pub use provider::{MockLocationProvider, MockPlaceProvider};
#[cfg(feature = "mock")]
pub use sync::MockSyncBackend;
