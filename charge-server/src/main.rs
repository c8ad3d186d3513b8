use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use charge_server::cache::{CacheConfig, StationCache};
use charge_server::config::ServerConfig;
use charge_server::directory::{
    DirectorySource, OpenChargeMapClient, OpenChargeMapConfig, StaticDirectory,
};
use charge_server::gateway::StationGateway;
use charge_server::geocode::Geocoder;
use charge_server::routing::{RouteResolver, RoutingConfig};
use charge_server::weather::WeatherClient;
use charge_server::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("charge_server=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    config.warn_missing();

    // Station directory: a fixed file when configured, else Open Charge Map
    let directory: Arc<dyn DirectorySource> = match &config.mock_stations_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "serving stations from file");
            Arc::new(StaticDirectory::from_file(path)?)
        }
        None => {
            let mut ocm = OpenChargeMapConfig::new(config.opencharge_api_key.clone());
            if let Some(url) = &config.opencharge_base_url {
                ocm = ocm.with_base_url(url);
            }
            Arc::new(OpenChargeMapClient::new(ocm)?)
        }
    };

    let cache = StationCache::new(&CacheConfig::default());
    let gateway = StationGateway::new(directory, cache);

    let mut routing = RoutingConfig::default();
    if let Some(url) = &config.osrm_base_url {
        routing = routing.with_base_url(url);
    }
    let routes = RouteResolver::new(routing)?;

    let geocoder = Geocoder::new(config.nominatim_base_url.clone())?;
    let weather = WeatherClient::new(
        config.openweather_api_key.clone(),
        config.openweather_base_url.clone(),
    )?;

    let state = AppState::new(gateway, routes, geocoder, weather);
    let app = create_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "EV Charging Station Finder listening");
    tracing::info!("  GET  /health           - Health check");
    tracing::info!("  GET  /stations         - Nearby stations (lat, lon, radius, maxResults)");
    tracing::info!("  GET  /stations/nearby  - Stations by distance with histogram");
    tracing::info!("  GET  /route            - Driving route (fromLat, fromLon, toLat, toLon)");
    tracing::info!("  GET  /geocode          - Place search (q)");
    tracing::info!("  GET  /weather          - Current weather (lat, lon)");

    axum::serve(listener, app).await?;
    Ok(())
}
