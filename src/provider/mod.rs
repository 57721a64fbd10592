//! External provider seams: place search and device location.
//!
//! Both traits use native async methods returning `Send` futures so callers
//! can stay generic and still spawn detached work. The live implementations
//! are platform shims owned by the embedding application; this crate ships
//! the contracts plus scripted mocks for tests.

pub mod error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{ProviderError, ProviderResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockLocationProvider, MockPlaceProvider};

use std::future::Future;
use std::time::Duration;

use crate::geo::{Circle, Coordinate};
use crate::poi::RawPlace;

/// A third-party place-search backend.
///
/// No ordering guarantee on results; an empty list is a legitimate response
/// even for valid input. The provider is known to occasionally return empty
/// on a cold first call; the search orchestrator compensates by retrying
/// whole tier sequences, so implementations should not retry internally.
pub trait PlaceSearchProvider: Send + Sync + 'static {
    /// Runs one free-text query against a circular region.
    fn query(
        &self,
        text: &str,
        region: Circle,
    ) -> impl Future<Output = ProviderResult<Vec<RawPlace>>> + Send;
}

/// A positioning fix as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub coordinate: Coordinate,
    /// Reported horizontal accuracy radius.
    pub accuracy_m: f64,
    /// How old the fix was when reported.
    pub age: Duration,
}

/// Access to the platform's positioning service.
pub trait LocationProvider: Send + Sync + 'static {
    /// Returns the most recent known fix, if any. Cheap; may be stale.
    fn current_fix(&self) -> impl Future<Output = Option<Fix>> + Send;

    /// Requests a one-shot fresh fix, triggering GPS warm-up. Resolves to
    /// `None` if no fix arrives within `timeout`.
    fn request_fix(&self, timeout: Duration) -> impl Future<Output = Option<Fix>> + Send;
}
