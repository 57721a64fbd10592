//! Coordinates, distances, and the rounded-coordinate POI identity.


use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Decimal places kept when deriving a [`PoiId`]. Four places is ~11 m of
/// latitude, so nearby re-detections of the same physical place collide
/// intentionally.
const ID_SCALE: f64 = 10_000.0;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_M * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// A circular search region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Coordinate,
    pub radius_m: f64,
}

impl Circle {
    #[inline]
    pub fn new(center: Coordinate, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    /// Returns `true` if `point` lies within the circle.
    #[inline]
    pub fn contains(&self, point: &Coordinate) -> bool {
        self.center.distance_m(point) <= self.radius_m
    }
}

/// Stable POI identity derived from the rounded coordinate.
///
/// The key is a pure function of the coordinate rounded to ~10 m precision,
/// so two detections of the same physical place get the same id regardless
/// of name differences. This is lossy by design: genuinely distinct places
/// that round identically also collide, a known tradeoff accepted in favor
/// of the intended duplicate merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(String);

impl PoiId {
    /// Derives the identity key for a coordinate.
    pub fn from_coordinate(coord: &Coordinate) -> Self {
        let lat = (coord.lat * ID_SCALE).round() as i64;
        let lon = (coord.lon * ID_SCALE).round() as i64;
        Self(format!("{lat}:{lon}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
