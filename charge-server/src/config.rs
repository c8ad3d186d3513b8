//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Default static assets directory.
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var} {value:?}: {source}")]
    InvalidAddr {
        var: &'static str,
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Everything the server reads from its environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,

    /// Open Charge Map key. Without one station lookups are served from
    /// cache only.
    pub opencharge_api_key: Option<String>,

    /// OpenWeatherMap key. Without one `/weather` answers 503.
    pub openweather_api_key: Option<String>,

    pub opencharge_base_url: Option<String>,
    pub osrm_base_url: Option<String>,
    pub nominatim_base_url: Option<String>,
    pub openweather_base_url: Option<String>,

    /// Serve stations from this JSON file instead of Open Charge Map.
    pub mock_stations_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let addr = get("CHARGE_FINDER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr.parse().map_err(|source| ConfigError::InvalidAddr {
            var: "CHARGE_FINDER_ADDR",
            value: addr.clone(),
            source,
        })?;

        Ok(Self {
            bind_addr,
            static_dir: get("CHARGE_FINDER_STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
                .into(),
            opencharge_api_key: get("OPENCHARGEMAP_API_KEY"),
            openweather_api_key: get("OPENWEATHER_API_KEY"),
            opencharge_base_url: get("OPENCHARGEMAP_BASE_URL"),
            osrm_base_url: get("OSRM_BASE_URL"),
            nominatim_base_url: get("NOMINATIM_BASE_URL"),
            openweather_base_url: get("OPENWEATHER_BASE_URL"),
            mock_stations_file: get("CHARGE_FINDER_MOCK_STATIONS").map(PathBuf::from),
        })
    }

    /// Log a warning for each missing credential.
    pub fn warn_missing(&self) {
        if self.opencharge_api_key.is_none() && self.mock_stations_file.is_none() {
            tracing::warn!("OPENCHARGEMAP_API_KEY not set; station lookups will fail");
        }
        if self.openweather_api_key.is_none() {
            tracing::warn!("OPENWEATHER_API_KEY not set; weather is disabled");
        }
    }
}
