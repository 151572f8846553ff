use std::{sync::Arc, time::Duration};

use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    backend::Backend,
    location::{LocationService, Position},
};

pub trait StateUpdateSender: Send + Sync + 'static {
    fn send_update(&self);
}

/// Where a tracking session currently is. `Stopped` carries the
/// human-readable reason when the stop was caused by a geolocation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub enum TrackingStatus {
    Idle,
    RequestingPermission,
    Sharing,
    Stopped(Option<String>),
}

/// Shares the device's position with the restaurant while an order is out
/// for delivery. Acquires an initial fix (triggering the permission prompt),
/// then watches the device for updates and sends the last known sample to
/// [Backend] at a fixed cadence.
///
/// The send timer and the device watch live inside [Self::main_loop] and are
/// dropped together on every exit path, so stopping the tracker can never
/// leave either behind.
pub struct LocationTracker<L: LocationService, B: Backend, S: StateUpdateSender> {
    order_id: Uuid,
    interval: Duration,
    location: L,
    backend: Arc<B>,
    updates: S,
    status: RwLock<TrackingStatus>,
    cancel: CancellationToken,
}

impl<L: LocationService, B: Backend, S: StateUpdateSender> LocationTracker<L, B, S> {
    pub fn new(
        order_id: Uuid,
        interval: Duration,
        location: L,
        backend: Arc<B>,
        updates: S,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            order_id,
            interval,
            location,
            backend,
            updates,
            status: RwLock::new(TrackingStatus::Idle),
            cancel,
        }
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub async fn status(&self) -> TrackingStatus {
        self.status.read().await.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn set_status(&self, status: TrackingStatus) {
        *self.status.write().await = status;
        self.updates.send_update();
    }

    /// Fire-and-forget: failures are logged, never surfaced to the user.
    /// The loop runs every second, per-failure notification would only
    /// produce alert fatigue.
    async fn send_location(&self, pos: Position) {
        if let Err(why) = self
            .backend
            .update_order_location(self.order_id, pos.lat, pos.long)
            .await
        {
            warn!("Failed to send location for order {}: {why:?}", self.order_id);
        }
    }

    /// Runs the tracking state machine to completion:
    /// `RequestingPermission -> Sharing -> Stopped`, with a direct jump to
    /// `Stopped` if the initial fix or the watch fails.
    pub async fn main_loop(&self) {
        self.set_status(TrackingStatus::RequestingPermission).await;

        // No timer or watch exists yet, so a denied permission (or any other
        // failure here) stops the session without anything to clean up.
        let first = match self.location.request_position().await {
            Ok(pos) => pos,
            Err(why) => {
                self.set_status(TrackingStatus::Stopped(Some(why.to_string())))
                    .await;
                return;
            }
        };

        let mut watch = match self.location.watch_position().await {
            Ok(watch) => watch,
            Err(why) => {
                self.set_status(TrackingStatus::Stopped(Some(why.to_string())))
                    .await;
                return;
            }
        };

        self.set_status(TrackingStatus::Sharing).await;

        // The "last known" slot. Written by watch events, read by the send
        // tick, never anything older than the most recent sample.
        let mut last = first;

        // The first tick fires immediately, covering the send-on-first-fix.
        let mut interval = tokio::time::interval(self.interval);

        let reason = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break None;
                }

                event = watch.recv() => match event {
                    Some(Ok(pos)) => last = pos,
                    Some(Err(why)) => {
                        warn!("Device watch failed for order {}: {why}", self.order_id);
                        break Some(why.to_string());
                    }
                    // Watch channel closed by the platform side
                    None => break None,
                },

                _ = interval.tick() => {
                    self.send_location(last).await;
                }
            }
        };

        self.set_status(TrackingStatus::Stopped(reason)).await;
        // Both `interval` and `watch` drop here, together.
    }
}
