//! Point-of-interest records and category classification.
//!
//! Classification is heuristic: the provider's category tag (when present)
//! and the display name are matched against small term tables to decide
//! whether a place is usable without a purchase.


use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, PoiId};

/// Access classification for a POI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Usable without a purchase: transit hub, park, public facility.
    FreeAccess,
    /// Restaurant, café, bar: usable, but a purchase is expected.
    PaidVenue,
    /// A bare fuel-station kiosk. Filtered out unless attached to a known
    /// large retail brand.
    FuelKiosk,
    Unknown,
}

/// Where a POI record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoiSource {
    LiveSearch,
    Cache,
    CrowdReported,
}

/// A raw place as returned by the search provider. No ordering guarantee;
/// fields beyond name and coordinate are best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Provider category tag, e.g. `"free public toilet"`.
    pub category: Option<String>,
    pub address: Option<String>,
}

/// A named place with a coordinate and a stable rounded-coordinate identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: PoiId,
    pub name: String,
    pub coordinate: Coordinate,
    pub address: Option<String>,
    pub category: Category,
    pub source: PoiSource,
}

impl PointOfInterest {
    /// Builds a POI from a provider result, deriving identity and category.
    pub fn from_raw(raw: &RawPlace, source: PoiSource) -> Self {
        let coordinate = Coordinate::new(raw.lat, raw.lon);
        Self {
            id: PoiId::from_coordinate(&coordinate),
            category: classify(&raw.name, raw.category.as_deref()),
            name: raw.name.clone(),
            coordinate,
            address: raw.address.clone(),
            source,
        }
    }

    /// Returns a copy tagged with a different source (e.g. when a cached
    /// record is served).
    pub fn with_source(&self, source: PoiSource) -> Self {
        Self { source, ..self.clone() }
    }

    #[inline]
    pub fn is_free_access(&self) -> bool {
        self.category == Category::FreeAccess
    }

    /// `true` for places that exist *for* the target need (a public toilet)
    /// rather than venues that merely have one.
    pub fn is_dedicated_facility(&self) -> bool {
        contains_any(&self.name.to_lowercase(), DEDICATED_FACILITY_TERMS)
    }
}

const DEDICATED_FACILITY_TERMS: &[&str] = &["toilet", "restroom", "lavatory", "wc", "washroom"];

const FREE_ACCESS_TERMS: &[&str] = &[
    "toilet",
    "restroom",
    "lavatory",
    "washroom",
    "wc",
    "station",
    "park",
    "library",
    "town hall",
    "community centre",
    "community center",
    "shopping centre",
    "shopping center",
    "mall",
    "supermarket",
];

const PAID_VENUE_TERMS: &[&str] = &[
    "cafe", "café", "coffee", "restaurant", "bar", "pub", "hotel", "bistro", "diner", "bakery",
];

const FUEL_TERMS: &[&str] = &["petrol", "gas station", "fuel", "service station", "filling station"];

/// Large retail brands whose fuel-station sites carry full facilities and are
/// exempt from the bare-kiosk filter.
const LARGE_RETAIL_BRANDS: &[&str] = &[
    "tesco",
    "sainsbury",
    "asda",
    "morrisons",
    "costco",
    "walmart",
    "carrefour",
    "marks & spencer",
    "m&s",
];

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| haystack.contains(t))
}

/// Classifies a place from its name and optional provider tag.
///
/// The tag is consulted first; the name is a fallback. Fuel terms win over
/// everything else so bare kiosks can be filtered; an explicit "paid" marker
/// beats the free-access term table (paid toilets exist).
pub fn classify(name: &str, tag: Option<&str>) -> Category {
    let name = name.to_lowercase();
    let tag = tag.map(str::to_lowercase);

    for text in tag.iter().map(String::as_str).chain(std::iter::once(name.as_str())) {
        if contains_any(text, FUEL_TERMS) {
            return Category::FuelKiosk;
        }
        if text.contains("paid") {
            return Category::PaidVenue;
        }
        if contains_any(text, FREE_ACCESS_TERMS) {
            return Category::FreeAccess;
        }
        if contains_any(text, PAID_VENUE_TERMS) {
            return Category::PaidVenue;
        }
    }

    Category::Unknown
}

/// Returns `true` if the name matches a known large retail brand.
pub fn is_large_retail_brand(name: &str) -> bool {
    contains_any(&name.to_lowercase(), LARGE_RETAIL_BRANDS)
}
