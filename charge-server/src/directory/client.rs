//! Open Charge Map HTTP client.

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::domain::Coordinate;

use super::error::DirectoryError;
use super::types::{Poi, parse_poi_array};

/// Default base URL for the Open Charge Map API.
const DEFAULT_BASE_URL: &str = "https://api.openchargemap.io/v3";

/// Directory calls fail after this many seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// A nearby-stations query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectoryQuery {
    pub center: Coordinate,

    /// Search radius in kilometers.
    pub radius_km: f64,

    pub max_results: u32,
}

/// A source of raw station records.
///
/// Implemented by the live Open Charge Map client and by
/// [`StaticDirectory`](super::StaticDirectory) for offline use and tests.
pub trait DirectorySource: Send + Sync {
    fn fetch_pois<'a>(
        &'a self,
        query: &'a DirectoryQuery,
    ) -> BoxFuture<'a, Result<Vec<Poi>, DirectoryError>>;
}

/// Configuration for the Open Charge Map client.
#[derive(Debug, Clone)]
pub struct OpenChargeMapConfig {
    /// API key for X-API-Key header authentication. Without one every
    /// request fails with [`DirectoryError::NotConfigured`].
    pub api_key: Option<String>,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenChargeMapConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for the Open Charge Map POI endpoint.
#[derive(Debug, Clone)]
pub struct OpenChargeMapClient {
    http: reqwest::Client,
    base_url: String,
    configured: bool,
}

impl OpenChargeMapClient {
    /// Create a new client.
    ///
    /// A missing API key is not an error here; the client is built and
    /// reports `NotConfigured` per request so the rest of the service runs.
    pub fn new(config: OpenChargeMapConfig) -> Result<Self, DirectoryError> {
        let mut headers = HeaderMap::new();

        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| DirectoryError::Api {
                status: 0,
                message: "Invalid API key format".to_string(),
            })?;
            headers.insert(HeaderName::from_static("x-api-key"), value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            configured: config.api_key.is_some(),
        })
    }

    /// Fetch POIs around a point.
    pub async fn fetch_nearby(&self, query: &DirectoryQuery) -> Result<Vec<Poi>, DirectoryError> {
        if !self.configured {
            return Err(DirectoryError::NotConfigured);
        }

        let url = format!("{}/poi/", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("output", "json".to_string()),
                ("latitude", query.center.latitude().to_string()),
                ("longitude", query.center.longitude().to_string()),
                ("distance", query.radius_km.to_string()),
                ("distanceunit", "KM".to_string()),
                ("maxresults", query.max_results.to_string()),
                ("compact", "false".to_string()),
                ("verbose", "false".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DirectoryError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;
        let pois = parse_poi_array(&body)?;

        tracing::debug!(
            center = %query.center,
            radius_km = query.radius_km,
            count = pois.len(),
            "fetched POIs from Open Charge Map"
        );

        Ok(pois)
    }
}

impl DirectorySource for OpenChargeMapClient {
    fn fetch_pois<'a>(
        &'a self,
        query: &'a DirectoryQuery,
    ) -> BoxFuture<'a, Result<Vec<Poi>, DirectoryError>> {
        Box::pin(self.fetch_nearby(query))
    }
}
