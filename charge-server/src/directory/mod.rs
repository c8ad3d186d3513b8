//! Charging station directory (Open Charge Map) client.
//!
//! Fetches raw points of interest around a coordinate and normalizes them
//! into [`Station`](crate::domain::Station) records, deriving an amenity set
//! from the free-text fields of each record.

mod client;
mod convert;
mod error;
mod mock;
mod types;

pub use client::{
    DEFAULT_TIMEOUT_SECS, DirectoryQuery, DirectorySource, OpenChargeMapClient,
    OpenChargeMapConfig,
};
pub use convert::{derive_amenities, normalize_poi, normalize_pois};
pub use error::DirectoryError;
pub use mock::{StaticDirectory, StaticResponse};
pub use types::{AddressInfo, ConnectionInfo, Poi, Titled, parse_poi_array};
