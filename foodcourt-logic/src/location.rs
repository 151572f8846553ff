use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::model::UtcDT;

/// A single device position sample. Ephemeral, only the most recent sample is
/// ever kept, in a slot owned by the tracking loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct Position {
    pub lat: f64,
    pub long: f64,
    pub captured_at: UtcDT,
}

/// Why the device could not produce a position. Surfaced to the user as a
/// dismissible status message, tracking halts and is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub enum LocationError {
    PermissionDenied,
    Unavailable,
    Timeout,
    Unsupported,
}

impl LocationError {
    pub fn message(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location permission denied. Please enable location access in your settings to share your live location with the restaurant."
            }
            Self::Unavailable => {
                "Location information is unavailable. Please check your device settings."
            }
            Self::Timeout => "Location request timed out. Please try again.",
            Self::Unsupported => "Geolocation is not supported on this device.",
        }
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for LocationError {}

/// Either a fresh sample or a watch failure, delivered on a watch channel.
pub type WatchEvent = Result<Position, LocationError>;

/// Access to the platform's geolocation facilities.
pub trait LocationService: Send + Sync + 'static {
    /// One-shot position fix. The first call is expected to trigger the
    /// platform permission prompt.
    fn request_position(&self) -> impl Future<Output = Result<Position, LocationError>> + Send;
    /// Begin a continuous watch. Samples and errors arrive on the returned
    /// channel until the receiver is dropped, which tears the device watch
    /// down.
    fn watch_position(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<WatchEvent>, LocationError>> + Send;
}
