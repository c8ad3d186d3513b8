//! Device position source abstraction.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::domain::Coordinate;

/// Options for a position request, mirroring what device geolocation APIs
/// accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,

    /// Maximum age of a cached fix the device may return.
    pub maximum_age: Duration,

    /// How long the device may take to produce a fix.
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            maximum_age: Duration::ZERO,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Why a position could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("timed out waiting for a position")]
    Timeout,

    #[error("geolocation is not supported on this device")]
    Unsupported,
}

/// A device that can report its position.
pub trait PositionSource: Send + Sync {
    /// Request a single fix.
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> BoxFuture<'_, Result<Coordinate, LocationError>>;

    /// Subscribe to continuous updates. Dropping the stream ends the
    /// subscription.
    fn watch_position(
        &self,
        options: PositionOptions,
    ) -> BoxStream<'static, Result<Coordinate, LocationError>>;
}
