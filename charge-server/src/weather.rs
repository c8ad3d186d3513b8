//! Current weather for station popups (OpenWeatherMap).

use serde::{Deserialize, Serialize};

use crate::domain::Coordinate;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Errors from the weather client.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather lookup not configured: OPENWEATHER_API_KEY is not set")]
    NotConfigured,

    #[error("unauthorized: check OPENWEATHER_API_KEY")]
    Unauthorized,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {message}")]
    Json { message: String },
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainReadings,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

/// Current conditions at a point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub description: String,
    pub icon: Option<String>,
    /// Degrees Celsius.
    pub temperature: f64,
    pub feels_like: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Meters per second.
    pub wind_speed: Option<f64>,
    pub location: Option<String>,
}

impl From<CurrentWeather> for WeatherReport {
    fn from(raw: CurrentWeather) -> Self {
        let condition = raw.weather.into_iter().next();
        Self {
            description: condition
                .as_ref()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            icon: condition.and_then(|c| c.icon),
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            humidity: raw.main.humidity,
            wind_speed: raw.wind.map(|w| w.speed),
            location: raw.name.filter(|n| !n.is_empty()),
        }
    }
}

/// OpenWeatherMap current-conditions client.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    /// Create a client. Without an API key every lookup fails with
    /// [`WeatherError::NotConfigured`].
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch current conditions, in metric units.
    pub async fn current(&self, at: Coordinate) -> Result<WeatherReport, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::NotConfigured)?;

        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", at.latitude().to_string()),
                ("lon", at.longitude().to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(WeatherError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_report(&body)
    }
}

fn parse_report(body: &str) -> Result<WeatherReport, WeatherError> {
    serde_json::from_str::<CurrentWeather>(body)
        .map(WeatherReport::from)
        .map_err(|e| WeatherError::Json {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_conditions() {
        let body = r#"{
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 12.3, "feels_like": 11.1, "humidity": 82, "pressure": 1012},
            "wind": {"speed": 4.6, "deg": 230},
            "name": "Shoreditch"
        }"#;
        let report = parse_report(body).unwrap();
        assert_eq!(report.description, "light rain");
        assert_eq!(report.icon.as_deref(), Some("10d"));
        assert_eq!(report.temperature, 12.3);
        assert_eq!(report.humidity, Some(82.0));
        assert_eq!(report.wind_speed, Some(4.6));
        assert_eq!(report.location.as_deref(), Some("Shoreditch"));
    }

    #[test]
    fn tolerates_sparse_payload() {
        let report = parse_report(r#"{"main": {"temp": -3.0}, "name": ""}"#).unwrap();
        assert_eq!(report.description, "");
        assert_eq!(report.temperature, -3.0);
        assert!(report.wind_speed.is_none());
        assert!(report.location.is_none());
    }

    #[test]
    fn missing_main_block_is_error() {
        assert!(parse_report(r#"{"cod": 401}"#).is_err());
    }

    #[tokio::test]
    async fn refuses_without_key() {
        let client = WeatherClient::new(None, Some("http://127.0.0.1:9".into())).unwrap();
        assert!(!client.is_configured());
        let err = client
            .current(Coordinate::new(51.5, -0.09).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::NotConfigured));
    }
}
