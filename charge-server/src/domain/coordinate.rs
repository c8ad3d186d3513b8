//! Geographic coordinate type and great-circle distance.

use std::fmt;

use serde::Serialize;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Error returned when constructing an out-of-range coordinate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid coordinate: {reason}")]
pub struct InvalidCoordinate {
    reason: &'static str,
}

/// A WGS84 latitude/longitude pair in degrees.
///
/// Latitude is always within `[-90, 90]` and longitude within `[-180, 180]`.
/// This type guarantees that any `Coordinate` value is valid by construction.
///
/// # Examples
///
/// ```
/// use charge_server::domain::Coordinate;
///
/// let london = Coordinate::new(51.5, -0.09).unwrap();
/// assert_eq!(london.latitude(), 51.5);
///
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// assert!(Coordinate::new(0.0, f64::NAN).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Result<Self, InvalidCoordinate> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(InvalidCoordinate {
                reason: "latitude and longitude must be finite",
            });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidCoordinate {
                reason: "latitude must be within [-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(InvalidCoordinate {
                reason: "longitude must be within [-180, 180]",
            });
        }
        Ok(Self { lat, lon })
    }

    /// Parse a coordinate from decimal strings, as sent in query parameters
    /// and by geocoding APIs.
    pub fn parse(lat: &str, lon: &str) -> Result<Self, InvalidCoordinate> {
        let lat = lat.trim().parse::<f64>().map_err(|_| InvalidCoordinate {
            reason: "latitude is not a number",
        })?;
        let lon = lon.trim().parse::<f64>().map_err(|_| InvalidCoordinate {
            reason: "longitude is not a number",
        })?;
        Self::new(lat, lon)
    }

    pub fn latitude(&self) -> f64 {
        self.lat
    }

    pub fn longitude(&self) -> f64 {
        self.lon
    }

    /// Great-circle distance to `other` in meters (haversine).
    ///
    /// Symmetric, and exactly zero for identical points.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        // Rounding can push `a` fractionally above 1 for antipodal points.
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_M * c
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coordinate({}, {})", self.lat, self.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}
