//! Data transfer objects for web requests and responses.
//!
//! Query parameters are taken as strings and parsed by the handlers so
//! that malformed values produce the JSON error body rather than axum's
//! plain-text rejection.

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate, Station};
use crate::gateway::NearbyStations;
use crate::projector::{HistogramBucket, ProjectedStation};
use crate::weather::WeatherReport;

/// Query for `/stations` and `/stations/nearby`.
#[derive(Debug, Default, Deserialize)]
pub struct StationsQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,

    /// Search radius in km (default 100)
    pub radius: Option<String>,

    /// Result cap (default 20)
    #[serde(rename = "maxResults")]
    pub max_results: Option<String>,
}

/// Response for `/stations`.
#[derive(Debug, Serialize)]
pub struct StationsResponse<'a> {
    pub stations: &'a [Station],

    pub success: bool,

    /// Whether the result came from the cache
    pub cached: bool,

    /// Present (and true) when a stale entry was served
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,

    /// Fetch time of cached data, milliseconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'a str>,
}

impl<'a> StationsResponse<'a> {
    pub fn from_nearby(nearby: &'a NearbyStations) -> Self {
        Self {
            stations: &nearby.stations,
            success: true,
            cached: nearby.cached,
            stale: nearby.stale.then_some(true),
            timestamp: nearby
                .cached
                .then(|| nearby.fetched_at.timestamp_millis()),
            warning: nearby.warning.as_deref(),
        }
    }
}

/// Response for `/stations/nearby`.
#[derive(Debug, Serialize)]
pub struct NearbyResponse<'a> {
    pub origin: Coordinate,

    /// Stations nearest first, each with a `distance` in meters
    pub stations: Vec<ProjectedStation>,

    pub histogram: Vec<HistogramBucket>,

    pub success: bool,
    pub cached: bool,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'a str>,
}

/// Query for `/route`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub from_lat: Option<String>,
    pub from_lon: Option<String>,
    pub to_lat: Option<String>,
    pub to_lon: Option<String>,
}

/// Response for `/route`.
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    /// `[lat, lon]` pairs in travel order
    pub path: Vec<[f64; 2]>,

    /// Total distance in meters
    pub distance: f64,
}

/// Query for `/geocode`.
#[derive(Debug, Default, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
}

/// Response for `/geocode`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
    pub lat: f64,
    pub lon: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Query for `/weather`.
#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

/// Response for `/weather`.
#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    #[serde(flatten)]
    pub report: WeatherReport,
    pub success: bool,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    pub success: bool,

    /// Underlying cause, when there is one worth showing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
