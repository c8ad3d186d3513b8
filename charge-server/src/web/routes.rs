//! HTTP route handlers.

use std::path::Path;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::domain::Coordinate;
use crate::gateway::{DEFAULT_MAX_RESULTS, DEFAULT_RADIUS_KM, GatewayError};
use crate::geocode::GeocodeError;
use crate::projector;
use crate::routing::RouteError;
use crate::weather::WeatherError;

use super::dto::*;
use super::state::AppState;
use super::templates::*;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/stations", get(stations))
        .route("/stations/nearby", get(nearby_stations))
        .route("/route", get(route))
        .route("/geocode", get(geocode))
        .route("/weather", get(weather))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Parse a required coordinate pair from query parameters.
fn require_coordinate(lat: Option<&str>, lon: Option<&str>) -> Result<Coordinate, AppError> {
    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Err(AppError::BadRequest {
            message: "Missing latitude or longitude parameters.".to_string(),
        });
    };
    Coordinate::parse(lat, lon).map_err(|e| AppError::BadRequest {
        message: format!("Invalid coordinates: {e}"),
    })
}

/// Radius and result cap, with defaults for absent values.
fn search_bounds(query: &StationsQuery) -> Result<(f64, u32), AppError> {
    let radius = match query.radius.as_deref() {
        None => DEFAULT_RADIUS_KM,
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| AppError::BadRequest {
                message: format!("Invalid radius: {raw}"),
            })?,
    };
    let max_results = match query.max_results.as_deref() {
        None => DEFAULT_MAX_RESULTS,
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::BadRequest {
                message: format!("Invalid maxResults: {raw}"),
            })?,
    };
    Ok((radius, max_results))
}

/// Nearby stations, normalized and cached.
async fn stations(
    State(state): State<AppState>,
    Query(query): Query<StationsQuery>,
) -> Result<Response, AppError> {
    let center = require_coordinate(query.lat.as_deref(), query.lon.as_deref())?;
    let (radius, max_results) = search_bounds(&query)?;

    let nearby = state
        .gateway
        .find_nearby(center, radius, max_results)
        .await?;

    Ok(Json(StationsResponse::from_nearby(&nearby)).into_response())
}

/// Nearby stations sorted by distance, with the distance histogram.
async fn nearby_stations(
    State(state): State<AppState>,
    Query(query): Query<StationsQuery>,
) -> Result<Response, AppError> {
    let center = require_coordinate(query.lat.as_deref(), query.lon.as_deref())?;
    let (radius, max_results) = search_bounds(&query)?;

    let nearby = state
        .gateway
        .find_nearby(center, radius, max_results)
        .await?;
    let projected = projector::project(center, &nearby.stations);
    let histogram = projector::histogram(&projected);

    Ok(Json(NearbyResponse {
        origin: center,
        stations: projected,
        histogram,
        success: true,
        cached: nearby.cached,
        stale: nearby.stale,
        warning: nearby.warning.as_deref(),
    })
    .into_response())
}

/// Driving route between two points.
async fn route(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RouteResponse>, AppError> {
    let from = require_coordinate(query.from_lat.as_deref(), query.from_lon.as_deref())?;
    let to = require_coordinate(query.to_lat.as_deref(), query.to_lon.as_deref())?;

    let route = state.routes.resolve(from, to).await?;

    Ok(Json(RouteResponse {
        path: route.path_pairs(),
        distance: route.distance_m,
    }))
}

/// Resolve free text to a coordinate.
async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeocodeResponse>, AppError> {
    let q = query.q.unwrap_or_default();
    let place = state
        .geocoder
        .search(&q)
        .await?
        .ok_or_else(|| AppError::NotFound {
            message: format!("No location found for {q:?}"),
        })?;

    Ok(Json(GeocodeResponse {
        lat: place.coordinate.latitude(),
        lon: place.coordinate.longitude(),
        display_name: place.display_name,
    }))
}

/// Current weather at a point.
async fn weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, AppError> {
    let at = require_coordinate(query.lat.as_deref(), query.lon.as_deref())?;
    let report = state.weather.current(at).await?;
    Ok(Json(WeatherResponse {
        report,
        success: true,
    }))
}

/// Query for the HTML page. Every field is optional: with none the page
/// shows only the search form.
#[derive(Debug, Default, Deserialize)]
struct IndexQuery {
    q: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
}

/// Index page with search form and results.
async fn index_page(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> IndexTemplate {
    let mut page = IndexTemplate {
        query: query.q.clone().unwrap_or_default(),
        lat: query.lat.clone().unwrap_or_default(),
        lon: query.lon.clone().unwrap_or_default(),
        histogram: BucketView::from_histogram(&projector::histogram(&[])),
        ..Default::default()
    };

    match locate(&state, &query).await {
        Ok(None) => {}
        Ok(Some(center)) => match state
            .gateway
            .find_nearby(center, DEFAULT_RADIUS_KM, DEFAULT_MAX_RESULTS)
            .await
        {
            Ok(nearby) => {
                let projected = projector::project(center, &nearby.stations);
                page.origin = Some(center.to_string());
                page.histogram = BucketView::from_histogram(&projector::histogram(&projected));
                page.stations = projected.iter().map(StationView::from_projected).collect();
                page.warning = nearby.warning;
            }
            Err(e) => {
                tracing::error!(error = %e, cause = %e.cause(), "index page station lookup failed");
                page.error = Some(e.to_string());
            }
        },
        Err(message) => page.error = Some(message),
    }

    page
}

/// Work out the page's search location. A place query wins over explicit
/// coordinates. Errors are messages for the page.
async fn locate(state: &AppState, query: &IndexQuery) -> Result<Option<Coordinate>, String> {
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        return match state.geocoder.search(q).await {
            Ok(Some(place)) => Ok(Some(place.coordinate)),
            Ok(None) => Err(format!("No location found for \"{}\"", q.trim())),
            Err(e) => {
                tracing::warn!(error = %e, "geocoding failed");
                Err("Location search is unavailable right now.".to_string())
            }
        };
    }

    match (query.lat.as_deref(), query.lon.as_deref()) {
        (Some(lat), Some(lon)) if !lat.trim().is_empty() || !lon.trim().is_empty() => {
            Coordinate::parse(lat, lon)
                .map(Some)
                .map_err(|e| format!("Invalid coordinates: {e}"))
        }
        _ => Ok(None),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    BadGateway { message: String, details: Option<String> },
    ServiceUnavailable { message: String },
    Internal { message: String, details: Option<String> },
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        let details = Some(e.cause().to_string());
        match e {
            GatewayError::Format(_) => AppError::BadGateway {
                message: "Unexpected response format from Open Charge Map API.".to_string(),
                details,
            },
            GatewayError::Unavailable(_) => AppError::Internal {
                message: "Failed to fetch charging stations".to_string(),
                details,
            },
        }
    }
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        if e.is_no_route() {
            AppError::NotFound {
                message: "No route found".to_string(),
            }
        } else {
            AppError::BadGateway {
                message: "Failed to resolve route".to_string(),
                details: Some(e.to_string()),
            }
        }
    }
}

impl From<GeocodeError> for AppError {
    fn from(e: GeocodeError) -> Self {
        match e {
            GeocodeError::EmptyQuery => AppError::BadRequest {
                message: "Missing search query parameter q.".to_string(),
            },
            _ => AppError::BadGateway {
                message: "Location search failed".to_string(),
                details: Some(e.to_string()),
            },
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::NotConfigured => AppError::ServiceUnavailable {
                message: e.to_string(),
            },
            _ => AppError::BadGateway {
                message: "Failed to fetch weather".to_string(),
                details: Some(e.to_string()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, details) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message, None),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message, None),
            AppError::BadGateway { message, details } => (StatusCode::BAD_GATEWAY, message, details),
            AppError::ServiceUnavailable { message } => {
                (StatusCode::SERVICE_UNAVAILABLE, message, None)
            }
            AppError::Internal { message, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, details)
            }
        };

        if status.is_server_error() {
            tracing::error!(%status, %message, details = details.as_deref(), "request failed");
        } else {
            tracing::warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse {
            error: message,
            success: false,
            details,
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::cache::{CacheConfig, StationCache};
    use crate::directory::{AddressInfo, Poi, StaticDirectory, StaticResponse, Titled};
    use crate::gateway::StationGateway;
    use crate::geocode::Geocoder;
    use crate::routing::{RouteResolver, RoutingConfig};
    use crate::weather::WeatherClient;

    /// Nothing listens here; requests fail fast with a connection error.
    const DEAD_UPSTREAM: &str = "http://127.0.0.1:9";

    fn poi(id: i64, title: &str, lat: f64, lon: f64) -> Poi {
        Poi {
            id: Some(id),
            address_info: Some(AddressInfo {
                title: Some(title.to_string()),
                latitude: Some(lat),
                longitude: Some(lon),
                ..Default::default()
            }),
            usage_type: Some(Titled {
                title: Some("Public - Membership Required".to_string()),
            }),
            ..Default::default()
        }
    }

    fn app(directory: StaticDirectory) -> Router {
        let gateway = StationGateway::new(
            std::sync::Arc::new(directory),
            StationCache::new(&CacheConfig::default()),
        );
        let routes = RouteResolver::new(RoutingConfig::default().with_base_url(DEAD_UPSTREAM)).unwrap();
        let geocoder = Geocoder::new(Some(DEAD_UPSTREAM.to_string())).unwrap();
        let weather = WeatherClient::new(None, Some(DEAD_UPSTREAM.to_string())).unwrap();
        create_router(AppState::new(gateway, routes, geocoder, weather), "static")
    }

    fn london_directory() -> StaticDirectory {
        StaticDirectory::new(vec![
            poi(2, "Far Depot", 51.60, -0.10),
            poi(1, "Near Hub", 51.505, -0.09),
        ])
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app(london_directory())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn stations_then_cached() {
        let directory = london_directory();
        let app = app(directory.clone());

        let (status, body) = get(&app, "/stations?lat=51.5&lon=-0.09").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["cached"], false);
        assert_eq!(body["stations"].as_array().unwrap().len(), 2);
        assert!(body.get("timestamp").is_none());

        let (status, body) = get(&app, "/stations?lat=51.5&lon=-0.09").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cached"], true);
        assert!(body["timestamp"].is_i64());
        assert_eq!(directory.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_coordinates_are_rejected() {
        let directory = london_directory();
        let app = app(directory.clone());

        let (status, body) = get(&app, "/stations?lat=51.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing latitude or longitude parameters.");
        assert_eq!(body["success"], false);
        assert_eq!(directory.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let app = app(london_directory());
        for uri in [
            "/stations?lat=north&lon=0",
            "/stations?lat=91&lon=0",
            "/stations?lat=0&lon=0&radius=-5",
            "/stations?lat=0&lon=0&maxResults=lots",
        ] {
            let (status, _) = get(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_upstream_is_bad_gateway() {
        let app = app(StaticDirectory::with_response(StaticResponse::Malformed));
        let (status, body) = get(&app, "/stations?lat=51.5&lon=-0.09").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            "Unexpected response format from Open Charge Map API."
        );
    }

    #[tokio::test]
    async fn unavailable_upstream_without_cache_is_internal_error() {
        let app = app(StaticDirectory::with_response(StaticResponse::Unavailable));
        let (status, body) = get(&app, "/stations?lat=51.5&lon=-0.09").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch charging stations");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn nearby_is_sorted_with_histogram() {
        let app = app(london_directory());
        let (status, body) = get(&app, "/stations/nearby?lat=51.5&lon=-0.09").await;
        assert_eq!(status, StatusCode::OK);

        let stations = body["stations"].as_array().unwrap();
        assert_eq!(stations[0]["name"], "Near Hub");
        assert_eq!(stations[1]["name"], "Far Depot");
        assert!(stations[0]["distance"].as_f64().unwrap() < stations[1]["distance"].as_f64().unwrap());

        let histogram = body["histogram"].as_array().unwrap();
        assert_eq!(histogram.len(), 5);
        let total: u64 = histogram.iter().map(|b| b["count"].as_u64().unwrap()).sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn route_requires_both_endpoints() {
        let app = app(london_directory());
        let (status, _) = get(&app, "/route?fromLat=51.5&fromLon=-0.09&toLat=51.6").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_router_is_bad_gateway() {
        let app = app(london_directory());
        let (status, body) =
            get(&app, "/route?fromLat=51.5&fromLon=-0.09&toLat=51.6&toLon=-0.1").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to resolve route");
    }

    #[tokio::test]
    async fn empty_geocode_query_is_rejected() {
        let app = app(london_directory());
        let (status, _) = get(&app, "/geocode?q=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn weather_without_key_is_unavailable() {
        let app = app(london_directory());
        let (status, body) = get(&app, "/weather?lat=51.5&lon=-0.09").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn index_lists_stations() {
        let response = app(london_directory())
            .oneshot(
                Request::builder()
                    .uri("/?lat=51.5&lon=-0.09")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        let near = html.find("Near Hub").unwrap();
        let far = html.find("Far Depot").unwrap();
        assert!(near < far);
        assert!(html.contains("Public - Membership Required"));
    }

    #[tokio::test]
    async fn index_reports_bad_coordinates_inline() {
        let directory = london_directory();
        let response = app(directory.clone())
            .oneshot(
                Request::builder()
                    .uri("/?lat=abc&lon=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Invalid coordinates"));
        assert_eq!(directory.call_count(), 0);
    }
}
