//! Scripted provider mocks with call inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{Fix, LocationProvider, PlaceSearchProvider, ProviderError, ProviderResult};
use crate::geo::{Circle, Coordinate};
use crate::poi::RawPlace;

/// In-memory place-search provider scripted per query string.
///
/// Responses are looked up by exact query text. A query can have a one-shot
/// sequence (consumed front to back, e.g. to simulate the provider's
/// cold-start empty response) layered over a steady response; unscripted
/// queries return an empty list. Every call is recorded for assertions.
#[derive(Default)]
pub struct MockPlaceProvider {
    steady: Mutex<HashMap<String, Vec<RawPlace>>>,
    sequences: Mutex<HashMap<String, VecDeque<Vec<RawPlace>>>>,
    failing: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<(String, f64)>>,
    total_calls: AtomicUsize,
}

impl MockPlaceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a steady response: every call for `query` returns `places`.
    pub fn script(&self, query: &str, places: Vec<RawPlace>) {
        self.steady.lock().insert(query.to_string(), places);
    }

    /// Scripts a one-shot sequence consumed before the steady response.
    pub fn script_sequence(&self, query: &str, responses: Vec<Vec<RawPlace>>) {
        self.sequences
            .lock()
            .insert(query.to_string(), responses.into());
    }

    /// Makes every call for `query` fail with [`ProviderError::RequestFailed`].
    pub fn fail_query(&self, query: &str, reason: &str) {
        self.failing
            .lock()
            .insert(query.to_string(), reason.to_string());
    }

    /// Number of calls made for `query`.
    pub fn query_count(&self, query: &str) -> usize {
        self.calls.lock().iter().filter(|(q, _)| q == query).count()
    }

    /// Total provider calls across all queries.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Every `(query, radius_m)` pair in call order.
    pub fn calls(&self) -> Vec<(String, f64)> {
        self.calls.lock().clone()
    }
}

impl PlaceSearchProvider for MockPlaceProvider {
    async fn query(&self, text: &str, region: Circle) -> ProviderResult<Vec<RawPlace>> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push((text.to_string(), region.radius_m));

        if let Some(reason) = self.failing.lock().get(text) {
            return Err(ProviderError::RequestFailed {
                reason: reason.clone(),
            });
        }

        if let Some(queue) = self.sequences.lock().get_mut(text) {
            if let Some(next) = queue.pop_front() {
                return Ok(next);
            }
        }

        Ok(self.steady.lock().get(text).cloned().unwrap_or_default())
    }
}

/// Scripted location provider.
///
/// `current_fix` pops a scripted sequence first and then falls back to a
/// steady fix; `request_fix` returns a separately scripted fix. Call counts
/// are recorded so tests can assert on polling behavior.
#[derive(Default)]
pub struct MockLocationProvider {
    current_sequence: Mutex<VecDeque<Option<Fix>>>,
    steady: Mutex<Option<Fix>>,
    requested: Mutex<Option<Fix>>,
    current_calls: AtomicUsize,
    request_calls: AtomicUsize,
}

impl MockLocationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that always reports the given good fix.
    pub fn with_fix(coordinate: Coordinate) -> Self {
        let provider = Self::new();
        provider.set_steady(Some(Fix {
            coordinate,
            accuracy_m: 10.0,
            age: Duration::from_secs(1),
        }));
        provider
    }

    /// A provider that never produces any fix.
    pub fn unavailable() -> Self {
        Self::new()
    }

    pub fn set_steady(&self, fix: Option<Fix>) {
        *self.steady.lock() = fix;
    }

    /// Scripts the next `current_fix` responses, consumed front to back.
    pub fn script_current(&self, fixes: Vec<Option<Fix>>) {
        *self.current_sequence.lock() = fixes.into();
    }

    /// Scripts the `request_fix` response.
    pub fn set_requested(&self, fix: Option<Fix>) {
        *self.requested.lock() = fix;
    }

    pub fn current_fix_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub fn request_fix_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }
}

impl LocationProvider for MockLocationProvider {
    async fn current_fix(&self) -> Option<Fix> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.current_sequence.lock().pop_front() {
            return next;
        }
        *self.steady.lock()
    }

    async fn request_fix(&self, _timeout: Duration) -> Option<Fix> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        *self.requested.lock()
    }
}
