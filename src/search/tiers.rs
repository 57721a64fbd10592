//! Search tiers: progressively wider radius, progressively broader terms.

/// One level of the tiered search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTier {
    pub radius_m: f64,
    pub queries: Vec<String>,
}

impl SearchTier {
    pub fn new(radius_m: f64, queries: &[&str]) -> Self {
        Self {
            radius_m,
            queries: queries.iter().map(|q| q.to_string()).collect(),
        }
    }
}

/// The shipped tier ladder.
///
/// Tier 1 asks for dedicated facilities close by; tier 2 adds transit and
/// retail places that reliably have one; tier 3 casts the widest net over
/// food and hospitality.
pub fn default_tiers() -> Vec<SearchTier> {
    vec![
        SearchTier::new(300.0, &["public toilet", "public restroom", "toilet"]),
        SearchTier::new(
            1_000.0,
            &[
                "public toilet",
                "public restroom",
                "toilet",
                "train station",
                "shopping centre",
                "supermarket",
                "petrol station",
            ],
        ),
        SearchTier::new(
            2_500.0,
            &[
                "public toilet",
                "public restroom",
                "toilet",
                "train station",
                "shopping centre",
                "supermarket",
                "petrol station",
                "cafe",
                "restaurant",
                "fast food",
                "hotel",
            ],
        ),
    ]
}
