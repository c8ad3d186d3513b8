//! Station gateway: cached, normalized access to the station directory.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, CacheKey, StationCache};
use crate::directory::{
    DEFAULT_TIMEOUT_SECS, DirectoryError, DirectoryQuery, DirectorySource, normalize_pois,
};
use crate::domain::{Coordinate, Station};

/// Warning attached to responses served from a stale cache entry.
pub const STALE_WARNING: &str = "Using stale cached data due to API error";

/// Search radius used when a caller does not specify one.
pub const DEFAULT_RADIUS_KM: f64 = 100.0;

/// Result cap used when a caller does not specify one.
pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Stations near a point, with their provenance.
#[derive(Debug, Clone)]
pub struct NearbyStations {
    pub stations: Arc<Vec<Station>>,

    /// Served from the cache rather than a fresh directory call.
    pub cached: bool,

    /// Served from a cache entry older than the TTL because the directory
    /// was unavailable.
    pub stale: bool,

    /// When the underlying data was fetched.
    pub fetched_at: DateTime<Utc>,

    pub warning: Option<String>,
}

impl NearbyStations {
    fn from_cache(entry: CacheEntry, stale: bool) -> Self {
        Self {
            stations: entry.stations,
            cached: true,
            stale,
            fetched_at: entry.created_at,
            warning: stale.then(|| STALE_WARNING.to_string()),
        }
    }
}

/// Gateway failures.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The directory answered with an unexpected payload shape.
    #[error("unexpected response format from station directory")]
    Format(#[source] DirectoryError),

    /// The directory could not be reached and nothing was cached.
    #[error("failed to fetch charging stations")]
    Unavailable(#[source] DirectoryError),
}

impl GatewayError {
    /// The underlying directory error.
    pub fn cause(&self) -> &DirectoryError {
        match self {
            GatewayError::Format(e) | GatewayError::Unavailable(e) => e,
        }
    }
}

/// Cached access to the station directory.
pub struct StationGateway {
    source: Arc<dyn DirectorySource>,
    cache: StationCache,
    timeout: Duration,
}

impl StationGateway {
    pub fn new(source: Arc<dyn DirectorySource>, cache: StationCache) -> Self {
        Self {
            source,
            cache,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the upstream call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &StationCache {
        &self.cache
    }

    /// Find stations within `radius_km` of `center`.
    ///
    /// Fresh cache entries are served without touching the directory. When
    /// the directory is unavailable any cached entry for the same query is
    /// served instead, marked stale. Malformed directory payloads are always
    /// reported.
    pub async fn find_nearby(
        &self,
        center: Coordinate,
        radius_km: f64,
        max_results: u32,
    ) -> Result<NearbyStations, GatewayError> {
        let key = CacheKey::new(center, radius_km);

        let cached = self.cache.get(&key).await;
        if let Some(lookup) = &cached
            && lookup.is_fresh
        {
            tracing::debug!(%center, radius_km, "station cache hit");
            return Ok(NearbyStations::from_cache(lookup.entry.clone(), false));
        }

        let query = DirectoryQuery {
            center,
            radius_km,
            max_results,
        };

        match self.fetch(&query).await {
            Ok(stations) => {
                tracing::info!(%center, radius_km, count = stations.len(), "fetched stations");
                let entry = self.cache.put(key, stations).await;
                Ok(NearbyStations {
                    stations: entry.stations,
                    cached: false,
                    stale: false,
                    fetched_at: entry.created_at,
                    warning: None,
                })
            }
            Err(e) if e.is_format() => {
                tracing::error!(%center, error = %e, "station directory returned malformed payload");
                Err(GatewayError::Format(e))
            }
            Err(e) => match cached {
                Some(lookup) => {
                    tracing::warn!(
                        %center,
                        error = %e,
                        fetched_at = %lookup.entry.created_at,
                        "station directory unavailable, serving stale cache"
                    );
                    Ok(NearbyStations::from_cache(lookup.entry, true))
                }
                None => {
                    tracing::error!(%center, error = %e, "station directory unavailable");
                    Err(GatewayError::Unavailable(e))
                }
            },
        }
    }

    async fn fetch(&self, query: &DirectoryQuery) -> Result<Vec<Station>, DirectoryError> {
        let pois = tokio::time::timeout(self.timeout, self.source.fetch_pois(query))
            .await
            .map_err(|_| DirectoryError::Timeout {
                secs: self.timeout.as_secs(),
            })??;
        Ok(normalize_pois(&pois))
    }
}
