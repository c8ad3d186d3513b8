//! Askama templates for the web frontend.

use askama::Template;

use crate::projector::{HistogramBucket, ProjectedStation};

// ============================================================================
// Page Templates (extend base.html)
// ============================================================================

/// Home page: search form, and results when a location was given.
#[derive(Template, Default)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    /// Place search text, echoed back into the form
    pub query: String,
    pub lat: String,
    pub lon: String,

    /// Display form of the searched location, once resolved
    pub origin: Option<String>,

    pub stations: Vec<StationView>,
    pub histogram: Vec<BucketView>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

// ============================================================================
// View Models (for templates)
// ============================================================================

/// Station view model for templates.
#[derive(Debug, Clone)]
pub struct StationView {
    pub id: String,
    pub name: String,
    pub address: String,

    /// Distance at display precision, e.g. "3.42 km"
    pub distance: String,

    pub operator: String,
    pub status: String,
    pub connectors: String,
    pub amenities: Vec<String>,
    pub fast: bool,
    pub url: Option<String>,
}

impl StationView {
    pub fn from_projected(projected: &ProjectedStation) -> Self {
        let station = &projected.station;

        let mut kinds: Vec<&str> = station
            .connection_types
            .iter()
            .map(|c| c.kind.as_str())
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        let connectors = match (station.connections, kinds.is_empty()) {
            (0, _) => "No connector data".to_string(),
            (n, true) => format!("{n} connectors"),
            (n, false) => format!("{n} × {}", kinds.join(", ")),
        };

        Self {
            id: station.id.clone(),
            name: station.name.clone(),
            address: station.display_address(),
            distance: format!("{:.2} km", projected.distance_km()),
            operator: station.operator.clone(),
            status: station.status.clone(),
            connectors,
            amenities: station.amenities.iter().cloned().collect(),
            fast: station.has_fast_connector(),
            url: Some(station.related_url.clone()).filter(|u| !u.is_empty()),
        }
    }
}

/// Histogram bar view model.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketView {
    pub label: &'static str,
    pub count: usize,

    /// Bar width relative to the fullest bucket, 0-100
    pub percent: usize,
}

impl BucketView {
    pub fn from_histogram(buckets: &[HistogramBucket]) -> Vec<Self> {
        let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
        buckets
            .iter()
            .map(|b| BucketView {
                label: b.label,
                count: b.count,
                percent: if max == 0 { 0 } else { b.count * 100 / max },
            })
            .collect()
    }
}
