//! Domain types for the charging station finder.
//!
//! These types represent validated geographic and station data. Coordinates
//! enforce their ranges at construction time, so code that receives them can
//! trust their validity.

mod coordinate;
mod route;
mod station;

pub use coordinate::{Coordinate, EARTH_RADIUS_M, InvalidCoordinate};
pub use route::RouteResult;
pub use station::{ConnectionType, Station, UNKNOWN_STATION};

#[cfg(test)]
pub(crate) use station::fixtures;
