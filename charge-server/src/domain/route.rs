//! Driving route values.

use super::Coordinate;

/// A resolved driving route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// Path polyline in travel order.
    pub path: Vec<Coordinate>,

    /// Total driving distance in meters.
    pub distance_m: f64,
}

impl RouteResult {
    /// Path as `[lat, lon]` pairs, the shape map polylines expect.
    pub fn path_pairs(&self) -> Vec<[f64; 2]> {
        self.path
            .iter()
            .map(|c| [c.latitude(), c.longitude()])
            .collect()
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }
}
