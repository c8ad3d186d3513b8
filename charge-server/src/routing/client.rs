//! OSRM routing client.

use crate::domain::{Coordinate, RouteResult};

use super::error::RouteError;
use super::types::{OsrmResponse, route_from_response};

/// Default base URL for the public OSRM demo server.
const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";

/// Configuration for the route resolver.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Base URL for the OSRM API
    pub base_url: String,
    /// Routing profile (e.g., "driving")
    pub profile: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            profile: "driving".to_string(),
        }
    }
}

impl RoutingConfig {
    /// Set a custom base URL (for testing or a self-hosted server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Resolves driving routes between two coordinates.
///
/// No retries: a new resolve is only attempted when an endpoint changes.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    http: reqwest::Client,
    config: RoutingConfig,
}

impl RouteResolver {
    pub fn new(config: RoutingConfig) -> Result<Self, RouteError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// Build the route URL. OSRM takes positions as `lon,lat`.
    fn route_url(&self, origin: &Coordinate, destination: &Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.config.base_url,
            self.config.profile,
            origin.longitude(),
            origin.latitude(),
            destination.longitude(),
            destination.latitude()
        )
    }

    /// Resolve the driving route from `origin` to `destination`.
    pub async fn resolve(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteResult, RouteError> {
        let url = self.route_url(&origin, &destination);

        let response = self
            .http
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // OSRM reports "no route" as a 400 with a JSON error code.
        let parsed: Result<OsrmResponse, _> = serde_json::from_str(&body);

        if !status.is_success() {
            return match parsed {
                Ok(r) if r.code == "NoRoute" || r.code == "NoSegment" => Err(RouteError::NoRoute),
                _ => Err(RouteError::Api {
                    status: status.as_u16(),
                    message: body.chars().take(500).collect(),
                }),
            };
        }

        let parsed = parsed.map_err(|e| RouteError::Json {
            message: e.to_string(),
        })?;

        let route = route_from_response(parsed)?;
        tracing::debug!(
            %origin,
            %destination,
            distance_m = route.distance_m,
            points = route.path.len(),
            "resolved route"
        );
        Ok(route)
    }
}
