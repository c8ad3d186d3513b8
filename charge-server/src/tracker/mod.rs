//! User position tracking.

mod machine;
mod source;

pub use machine::{FixOrigin, GeolocationTracker, PositionUpdate, TrackerConfig, TrackerState};
pub use source::{LocationError, PositionOptions, PositionSource};
