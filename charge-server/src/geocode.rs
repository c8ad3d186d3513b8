//! Free-text location search (Nominatim).

use serde::Deserialize;

use crate::domain::{Coordinate, InvalidCoordinate};

/// Default base URL for the public Nominatim instance.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim's usage policy requires an identifying User-Agent.
const USER_AGENT: &str = concat!("charge-server/", env!("CARGO_PKG_VERSION"));

/// Errors from geocoding.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("search query is empty")]
    EmptyQuery,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoding API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {message}")]
    Json { message: String },

    #[error("geocoder returned {0}")]
    InvalidCoordinate(#[from] InvalidCoordinate),
}

/// A search hit. Nominatim sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// A resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub coordinate: Coordinate,
    pub display_name: Option<String>,
}

/// Nominatim search client.
#[derive(Debug, Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(base_url: Option<String>) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Look up the first place matching `query`.
    ///
    /// `Ok(None)` means the search ran and found nothing.
    pub async fn search(&self, query: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::EmptyQuery);
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let place = first_place(&body)?;
        tracing::debug!(query, found = place.is_some(), "geocoded");
        Ok(place)
    }
}

/// Parse a Nominatim search response, keeping only the first hit.
fn first_place(body: &str) -> Result<Option<GeocodedPlace>, GeocodeError> {
    let places: Vec<Place> = serde_json::from_str(body).map_err(|e| GeocodeError::Json {
        message: e.to_string(),
    })?;

    places
        .into_iter()
        .next()
        .map(|place| {
            Ok(GeocodedPlace {
                coordinate: Coordinate::parse(&place.lat, &place.lon)?,
                display_name: place.display_name,
            })
        })
        .transpose()
}
