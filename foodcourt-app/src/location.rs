use std::sync::{Arc, OnceLock};

use chrono::{TimeZone, Utc};
use log::warn;
use tauri::{AppHandle, plugin::PermissionState};
use tauri_plugin_geolocation::{
    GeolocationExt, PermissionType, Position as DevicePosition, PositionOptions,
    WatchEvent as DeviceWatchEvent,
};
use tokio::sync::mpsc;

use foodcourt_logic::{LocationError, LocationService, Position, WatchEvent};

/// High accuracy, 10 second timeout, never serve a cached position.
fn position_options() -> PositionOptions {
    PositionOptions {
        enable_high_accuracy: true,
        timeout: 10_000,
        maximum_age: 0,
    }
}

fn convert(pos: DevicePosition) -> Position {
    let captured_at = Utc
        .timestamp_millis_opt(pos.timestamp as i64)
        .single()
        .unwrap_or_else(Utc::now);
    Position {
        lat: pos.coords.latitude,
        long: pos.coords.longitude,
        captured_at,
    }
}

fn classify(message: &str) -> LocationError {
    let message = message.to_ascii_lowercase();
    if message.contains("denied") || message.contains("permission") {
        LocationError::PermissionDenied
    } else if message.contains("timed out") || message.contains("timeout") {
        LocationError::Timeout
    } else if message.contains("not supported") || message.contains("unsupported") {
        LocationError::Unsupported
    } else {
        LocationError::Unavailable
    }
}

/// [LocationService] backed by the platform geolocation plugin.
#[derive(Clone)]
pub struct TauriLocation {
    app: AppHandle,
}

impl TauriLocation {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl LocationService for TauriLocation {
    async fn request_position(&self) -> Result<Position, LocationError> {
        let geolocation = self.app.geolocation();

        let status = geolocation
            .request_permissions(Some(vec![PermissionType::Location]))
            .map_err(|why| classify(&why.to_string()))?;
        if status.location != PermissionState::Granted {
            return Err(LocationError::PermissionDenied);
        }

        geolocation
            .get_current_position(Some(position_options()))
            .map(convert)
            .map_err(|why| classify(&why.to_string()))
    }

    async fn watch_position(&self) -> Result<mpsc::Receiver<WatchEvent>, LocationError> {
        let (tx, rx) = mpsc::channel(16);

        // The watch id only exists after registration, but the callback
        // needs it to clear the device watch once the receiver is gone.
        let watch_id = Arc::new(OnceLock::new());

        let callback = {
            let app = self.app.clone();
            let watch_id = watch_id.clone();
            move |event: DeviceWatchEvent| {
                let event = match event {
                    DeviceWatchEvent::Position(pos) => Ok(convert(pos)),
                    DeviceWatchEvent::Error(message) => Err(classify(&message)),
                };

                if tx.try_send(event).is_err()
                    && let Some(id) = watch_id.get()
                    && let Err(why) = app.geolocation().clear_watch(*id)
                {
                    warn!("Failed to clear device watch {id}: {why:?}");
                }
            }
        };

        let id = self
            .app
            .geolocation()
            .watch_position(position_options(), callback)
            .map_err(|why| classify(&why.to_string()))?;
        watch_id.set(id).ok();

        Ok(rx)
    }
}
