//! Normalized charging station records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Coordinate;

/// Name used when the directory record has no title.
pub const UNKNOWN_STATION: &str = "Unknown Station";

/// A single connector at a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionType {
    /// Connector type title (e.g., "Type 2 (Socket Only)")
    #[serde(rename = "type")]
    pub kind: String,

    /// Charging level title (e.g., "Level 3:  High (Over 40kW)")
    pub level: String,

    pub amps: Option<f64>,

    pub voltage: Option<f64>,
}

impl ConnectionType {
    /// Whether the level description indicates DC fast charging.
    pub fn is_fast(&self) -> bool {
        self.level.contains('3') || self.level.contains("DC") || self.level.contains("Fast")
    }
}

/// A charging station as served to clients.
///
/// Built once from a directory record and never mutated afterwards, so a
/// single list can be shared between the cache and every response. Distance
/// from the user is attached separately by the projector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Directory ID when supplied, otherwise derived from name and position.
    pub id: String,

    pub name: String,

    #[serde(flatten)]
    pub coordinate: Coordinate,

    pub address: String,
    pub town: String,
    pub state_or_province: String,
    pub postcode: String,
    pub country: String,

    /// Number of connectors.
    pub connections: usize,

    pub connection_types: Vec<ConnectionType>,

    #[serde(rename = "operatorInfo")]
    pub operator: String,

    pub usage_type: String,

    #[serde(rename = "statusType")]
    pub status: String,

    #[serde(rename = "dateLastVerified")]
    pub last_verified: Option<DateTime<Utc>>,

    pub related_url: String,

    /// Amenity labels; a set, serialized in sorted order.
    pub amenities: BTreeSet<String>,
}

impl Station {
    /// Derive a stable identifier for records the directory did not number.
    pub fn derive_id(name: &str, coordinate: &Coordinate) -> String {
        format!(
            "{}@{:.5},{:.5}",
            name,
            coordinate.latitude(),
            coordinate.longitude()
        )
    }

    /// Whether any connector supports fast charging.
    pub fn has_fast_connector(&self) -> bool {
        self.connection_types.iter().any(ConnectionType::is_fast)
    }

    /// Single-line address for display, skipping empty parts.
    pub fn display_address(&self) -> String {
        [
            self.address.as_str(),
            self.town.as_str(),
            self.state_or_province.as_str(),
            self.postcode.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A minimal station at the given position.
    pub fn station(id: &str, lat: f64, lon: f64) -> Station {
        Station {
            id: id.to_string(),
            name: format!("Station {id}"),
            coordinate: Coordinate::new(lat, lon).unwrap(),
            address: String::new(),
            town: String::new(),
            state_or_province: String::new(),
            postcode: String::new(),
            country: String::new(),
            connections: 0,
            connection_types: Vec::new(),
            operator: "Unknown Operator".to_string(),
            usage_type: "Public".to_string(),
            status: "Operational".to_string(),
            last_verified: None,
            related_url: String::new(),
            amenities: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::station;
    use super::*;

    fn connector(level: &str) -> ConnectionType {
        ConnectionType {
            kind: "CCS".to_string(),
            level: level.to_string(),
            amps: None,
            voltage: None,
        }
    }

    #[test]
    fn fast_levels() {
        assert!(connector("Level 3:  High (Over 40kW)").is_fast());
        assert!(connector("DC Fast").is_fast());
        assert!(connector("Fast Charge").is_fast());
        assert!(!connector("Level 2 : Medium (Over 2kW)").is_fast());
        assert!(!connector("Unknown").is_fast());
    }

    #[test]
    fn derived_id_includes_position() {
        let c = Coordinate::new(51.5, -0.09).unwrap();
        assert_eq!(Station::derive_id("Depot", &c), "Depot@51.50000,-0.09000");
    }

    #[test]
    fn display_address_skips_empty_parts() {
        let mut s = station("1", 51.5, -0.09);
        s.address = "1 High Street".to_string();
        s.postcode = "EC1A 1AA".to_string();
        assert_eq!(s.display_address(), "1 High Street, EC1A 1AA");
    }

    #[test]
    fn serializes_flat_coordinates() {
        let s = station("7", 51.5, -0.09);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["lat"], 51.5);
        assert_eq!(json["lon"], -0.09);
        assert_eq!(json["operatorInfo"], "Unknown Operator");
        assert_eq!(json["usageType"], "Public");
        assert!(json["dateLastVerified"].is_null());
    }
}
