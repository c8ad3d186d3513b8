//! Open Charge Map POI payload types.
//!
//! Every field is optional: the directory omits or nulls fields freely,
//! and normalization supplies the defaults.

use serde::Deserialize;
use serde_json::Value;

use super::error::DirectoryError;

/// A raw point of interest from the directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Poi {
    #[serde(rename = "ID")]
    pub id: Option<i64>,

    pub address_info: Option<AddressInfo>,

    pub connections: Option<Vec<ConnectionInfo>>,

    pub operator_info: Option<Titled>,

    pub usage_type: Option<Titled>,

    pub status_type: Option<Titled>,

    pub date_last_verified: Option<String>,
}

/// Location block of a POI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressInfo {
    pub title: Option<String>,

    #[serde(rename = "AddressLine1")]
    pub address_line1: Option<String>,

    pub town: Option<String>,

    pub state_or_province: Option<String>,

    pub postcode: Option<String>,

    pub country: Option<Titled>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    #[serde(rename = "RelatedURL")]
    pub related_url: Option<String>,

    pub access_comments: Option<String>,

    pub general_comments: Option<String>,
}

/// A connector entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionInfo {
    pub connection_type: Option<Titled>,

    pub level: Option<Titled>,

    pub amps: Option<f64>,

    pub voltage: Option<f64>,
}

/// Reference-data objects (operator, usage type, status, ...) carry a title.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Titled {
    pub title: Option<String>,
}

impl Titled {
    pub fn named(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
        }
    }
}

/// Parse a directory response body.
///
/// The body must be a JSON array; anything else is a format error. Array
/// elements that are not POI objects are skipped.
pub fn parse_poi_array(body: &str) -> Result<Vec<Poi>, DirectoryError> {
    let value: Value = serde_json::from_str(body).map_err(|e| DirectoryError::Format {
        message: format!("{e} (body: {})", body.chars().take(200).collect::<String>()),
    })?;

    let Value::Array(items) = value else {
        return Err(DirectoryError::Format {
            message: "expected a JSON array of POIs".to_string(),
        });
    };

    let pois = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<Poi>(item) {
            Ok(poi) => Some(poi),
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "skipping malformed POI");
                None
            }
        })
        .collect();

    Ok(pois)
}
