//! Conversion from directory POIs to domain stations.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::{ConnectionType, Coordinate, Station, UNKNOWN_STATION};

use super::types::{Poi, Titled};

/// Keyword → amenity label. A keyword matches when it is a substring of the
/// lower-cased station text.
const AMENITY_KEYWORDS: &[(&str, &str)] = &[
    ("coffee", "Coffee Shop"),
    ("cafe", "Café"),
    ("restaurant", "Restaurant"),
    ("shop", "Shop"),
    ("market", "Market"),
    ("mall", "Shopping Mall"),
    ("supermarket", "Supermarket"),
    ("hotel", "Hotel"),
    ("motel", "Motel"),
    ("toilet", "Restrooms"),
    ("bathroom", "Restrooms"),
    ("restroom", "Restrooms"),
    ("wc", "Restrooms"),
    ("food", "Food"),
    ("dining", "Dining"),
    ("store", "Store"),
    ("wifi", "WiFi"),
    ("internet", "WiFi"),
    ("parking", "Parking"),
    ("park", "Park"),
    ("playground", "Playground"),
    ("picnic", "Picnic Area"),
    ("lounge", "Lounge"),
    ("wait", "Waiting Area"),
    ("charge", "Fast Charging"),
    ("fast charg", "Fast Charging"),
];

const UNKNOWN_USAGE_TYPE: &str = "Unknown Usage Type";

/// Usage types too generic to be worth listing as an amenity.
const GENERIC_USAGE_TYPES: &[&str] = &["Unknown", "Public", "Private", UNKNOWN_USAGE_TYPE];

const FAST_CHARGING: &str = "Fast Charging";

fn title_or(titled: Option<&Titled>, default: &str) -> String {
    titled
        .and_then(|t| t.title.as_deref())
        .unwrap_or(default)
        .to_string()
}

fn text_or_empty(s: Option<&String>) -> String {
    s.cloned().unwrap_or_default()
}

/// Parse the directory's verification timestamp.
///
/// The directory usually sends RFC 3339, but older records lack the offset.
fn parse_verified(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Derive the amenity set for a station.
///
/// `text` is every free-text field of the record; matching is
/// case-insensitive.
pub fn derive_amenities(
    text: &[&str],
    usage_type: &str,
    connection_types: &[ConnectionType],
) -> BTreeSet<String> {
    let haystack = text.join(" ").to_lowercase();

    let mut amenities: BTreeSet<String> = AMENITY_KEYWORDS
        .iter()
        .filter(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, label)| (*label).to_string())
        .collect();

    if !usage_type.is_empty() && !GENERIC_USAGE_TYPES.contains(&usage_type) {
        amenities.insert(usage_type.to_string());
    }

    if connection_types.iter().any(ConnectionType::is_fast) {
        amenities.insert(FAST_CHARGING.to_string());
    }

    amenities
}

/// Normalize one POI.
///
/// Returns `None` for records without a usable coordinate.
pub fn normalize_poi(poi: &Poi) -> Option<Station> {
    let info = poi.address_info.clone().unwrap_or_default();

    let coordinate = match (info.latitude, info.longitude) {
        (Some(lat), Some(lon)) => match Coordinate::new(lat, lon) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(id = ?poi.id, error = %e, "dropping POI with invalid coordinate");
                return None;
            }
        },
        _ => return None,
    };

    let name = info
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_STATION.to_string());

    let connection_types: Vec<ConnectionType> = poi
        .connections
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|conn| ConnectionType {
            kind: title_or(conn.connection_type.as_ref(), "Unknown"),
            level: title_or(conn.level.as_ref(), "Unknown"),
            amps: conn.amps,
            voltage: conn.voltage,
        })
        .collect();

    let address = text_or_empty(info.address_line1.as_ref());
    let related_url = text_or_empty(info.related_url.as_ref());
    let usage_type = title_or(poi.usage_type.as_ref(), UNKNOWN_USAGE_TYPE);

    let amenities = derive_amenities(
        &[
            name.as_str(),
            address.as_str(),
            related_url.as_str(),
            info.access_comments.as_deref().unwrap_or_default(),
            info.general_comments.as_deref().unwrap_or_default(),
        ],
        &usage_type,
        &connection_types,
    );

    let id = match poi.id {
        Some(id) => id.to_string(),
        None => Station::derive_id(&name, &coordinate),
    };

    Some(Station {
        id,
        name,
        coordinate,
        address,
        town: text_or_empty(info.town.as_ref()),
        state_or_province: text_or_empty(info.state_or_province.as_ref()),
        postcode: text_or_empty(info.postcode.as_ref()),
        country: title_or(info.country.as_ref(), ""),
        connections: connection_types.len(),
        connection_types,
        operator: title_or(poi.operator_info.as_ref(), "Unknown Operator"),
        usage_type,
        status: title_or(poi.status_type.as_ref(), "Unknown Status"),
        last_verified: poi.date_last_verified.as_deref().and_then(parse_verified),
        related_url,
        amenities,
    })
}

/// Normalize a directory response, dropping records without coordinates.
pub fn normalize_pois(pois: &[Poi]) -> Vec<Station> {
    pois.iter().filter_map(normalize_poi).collect()
}
