//! Routing error types.

/// Errors from resolving a driving route.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Routing service returned an error status
    #[error("routing API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// No drivable route between the two points
    #[error("no route found")]
    NoRoute,

    /// The route geometry contained an invalid coordinate
    #[error("invalid route geometry: {0}")]
    InvalidGeometry(#[from] crate::domain::InvalidCoordinate),
}

impl RouteError {
    /// Whether the failure means "no path" rather than "service trouble".
    pub fn is_no_route(&self) -> bool {
        matches!(self, RouteError::NoRoute)
    }
}
