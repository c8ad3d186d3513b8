//! Driving route resolution (OSRM).

mod client;
mod error;
mod types;

pub use client::{RouteResolver, RoutingConfig};
pub use error::RouteError;
pub use types::{GeoJsonLine, OsrmResponse, OsrmRoute, route_from_response};
