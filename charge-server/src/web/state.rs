//! Application state for the web layer.

use std::sync::Arc;

use crate::gateway::StationGateway;
use crate::geocode::Geocoder;
use crate::routing::RouteResolver;
use crate::weather::WeatherClient;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Cached station directory access
    pub gateway: Arc<StationGateway>,

    /// Driving routes
    pub routes: Arc<RouteResolver>,

    /// Place search
    pub geocoder: Arc<Geocoder>,

    /// Current conditions for station popups
    pub weather: Arc<WeatherClient>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        gateway: StationGateway,
        routes: RouteResolver,
        geocoder: Geocoder,
        weather: WeatherClient,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            routes: Arc::new(routes),
            geocoder: Arc::new(geocoder),
            weather: Arc::new(weather),
        }
    }
}
