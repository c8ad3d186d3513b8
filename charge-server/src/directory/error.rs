//! Station directory error types.

/// Errors that can occur when querying the charging station directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// HTTP request failed (network error, connection refused, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the allowed time
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Authentication failed
    #[error("unauthorized: check OPENCHARGEMAP_API_KEY")]
    Unauthorized,

    /// API returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON array
    #[error("unexpected response format: {message}")]
    Format { message: String },

    /// No API key configured
    #[error("station directory not configured: OPENCHARGEMAP_API_KEY is not set")]
    NotConfigured,
}

impl DirectoryError {
    /// Whether the upstream answered with a payload of the wrong shape.
    ///
    /// Format errors are reported as such and never masked by cached data;
    /// every other variant means the directory was unavailable.
    pub fn is_format(&self) -> bool {
        matches!(self, DirectoryError::Format { .. })
    }
}
