use std::{sync::Arc, time::Duration};

use log::{info, warn};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    backend::Backend,
    location::LocationService,
    tracker::{LocationTracker, StateUpdateSender, TrackingStatus},
};

/// Session-scoped storage for the active-order marker. There is at most one
/// marker per session, it survives a reload so tracking can resume, and it is
/// cleared as soon as the order reaches a terminal status.
pub trait MarkerStore: Send + Sync + 'static {
    fn load(&self) -> Option<Uuid>;
    fn save(&self, order: Uuid);
    fn clear(&self);
}

/// Snapshot of the orders screen for the UI.
#[derive(Debug, Clone, Serialize, specta::Type)]
pub struct OrdersUiState {
    /// The caller's orders, newest first
    pub orders: Vec<crate::model::Order>,
    pub tracked_order: Option<Uuid>,
    pub tracking: TrackingStatus,
}

/// The customer's orders screen: refreshes the caller's orders on a fixed
/// cadence and owns the live-tracking lifecycle for the active order.
///
/// The tracker runs on a child [CancellationToken], so quitting the session
/// (screen change, app exit) tears the refresh loop and the tracker down
/// together.
pub struct OrderSession<L, B, S, M>
where
    L: LocationService + Clone,
    B: Backend,
    S: StateUpdateSender + Clone,
    M: MarkerStore,
{
    backend: Arc<B>,
    location: L,
    marker: M,
    updates: S,
    refresh_interval: Duration,
    send_interval: Duration,
    orders: RwLock<Vec<crate::model::Order>>,
    tracker: RwLock<Option<Arc<LocationTracker<L, B, S>>>>,
    cancel: CancellationToken,
}

impl<L, B, S, M> OrderSession<L, B, S, M>
where
    L: LocationService + Clone,
    B: Backend,
    S: StateUpdateSender + Clone,
    M: MarkerStore,
{
    pub fn new(
        backend: Arc<B>,
        location: L,
        marker: M,
        updates: S,
        refresh_interval: Duration,
        send_interval: Duration,
    ) -> Self {
        Self {
            backend,
            location,
            marker,
            updates,
            refresh_interval,
            send_interval,
            orders: RwLock::new(Vec::new()),
            tracker: RwLock::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn ui_state(&self) -> OrdersUiState {
        let tracking = match &*self.tracker.read().await {
            Some(tracker) => tracker.status().await,
            None => TrackingStatus::Idle,
        };
        OrdersUiState {
            orders: self.orders.read().await.clone(),
            tracked_order: self.marker.load(),
            tracking,
        }
    }

    /// Persist the marker for a freshly placed order and begin sharing the
    /// device position with the restaurant. Replaces (and stops) any tracker
    /// from a previous order, keeping the one-marker-per-session invariant.
    pub async fn start_tracking(&self, order: Uuid) {
        self.marker.save(order);
        self.spawn_tracker(order).await;
        self.updates.send_update();
    }

    /// Explicit stop: clear the marker and cancel the tracker.
    pub async fn stop_tracking(&self) {
        self.marker.clear();
        if let Some(tracker) = self.tracker.write().await.take() {
            tracker.stop();
        }
        self.updates.send_update();
    }

    /// Tear down the whole session, tracker included.
    pub fn quit(&self) {
        self.cancel.cancel();
    }

    async fn spawn_tracker(&self, order: Uuid) {
        let tracker = Arc::new(LocationTracker::new(
            order,
            self.send_interval,
            self.location.clone(),
            self.backend.clone(),
            self.updates.clone(),
            self.cancel.child_token(),
        ));

        let mut slot = self.tracker.write().await;
        if let Some(old) = slot.replace(tracker.clone()) {
            old.stop();
        }
        drop(slot);

        tokio::spawn(async move { tracker.main_loop().await });
    }

    async fn refresh_orders(&self) {
        let mut orders = match self.backend.fetch_my_orders().await {
            Ok(orders) => orders,
            Err(why) => {
                // Background refresh, log only
                warn!("Failed to refresh orders: {why:?}");
                return;
            }
        };

        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));

        if let Some(tracked) = self.marker.load() {
            let done = orders
                .iter()
                .any(|order| order.id == tracked && order.status.is_terminal());
            if done {
                info!("Order {tracked} reached a terminal status, tracking stops");
                self.stop_tracking().await;
            }
        }

        *self.orders.write().await = orders;
        self.updates.send_update();
    }

    /// Resume tracking from a persisted marker, then refresh the order list
    /// until the session is quit.
    pub async fn main_loop(&self) {
        if let Some(order) = self.marker.load() {
            info!("Resuming live tracking for order {order}");
            self.spawn_tracker(order).await;
        }

        let mut interval = tokio::time::interval(self.refresh_interval);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                _ = interval.tick() => {
                    self.refresh_orders().await;
                }
            }
        }
        // The tracker's token is a child of ours, it is cancelled with us.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::OrderStatus,
        tests::{DummySender, MockBackend, MockLocation, MockMarker, mk_order, pos, settle},
    };
    use tokio::test;

    const REFRESH: Duration = Duration::from_secs(3);
    const SEND: Duration = Duration::from_secs(1);

    type TestSession = OrderSession<MockLocation, MockBackend, DummySender, MockMarker>;

    struct Fixture {
        backend: Arc<MockBackend>,
        location: MockLocation,
        marker: MockMarker,
        session: Arc<TestSession>,
    }

    impl Fixture {
        fn new(marker: MockMarker) -> Self {
            let backend = Arc::new(MockBackend::default());
            let location = MockLocation::with_fix(pos(1.0, 2.0));
            let session = Arc::new(TestSession::new(
                backend.clone(),
                location.clone(),
                marker.clone(),
                DummySender,
                REFRESH,
                SEND,
            ));
            Self {
                backend,
                location,
                marker,
                session,
            }
        }

        fn spawn(&self) {
            let session = self.session.clone();
            tokio::spawn(async move { session.main_loop().await });
        }
    }

    #[test]
    async fn test_marker_resumes_tracking() {
        tokio::time::pause();
        let order = Uuid::new_v4();
        let fix = Fixture::new(MockMarker::with_order(order));
        fix.backend
            .set_my_orders(vec![mk_order(order, OrderStatus::OutForDelivery)]);

        fix.spawn();
        settle().await;

        assert_eq!(
            fix.session.ui_state().await.tracking,
            TrackingStatus::Sharing
        );
        assert_eq!(
            fix.backend.location_sends().first(),
            Some(&(order, 1.0, 2.0)),
            "Resumed session did not send the position"
        );
    }

    #[test]
    async fn test_terminal_status_clears_marker_and_halts_sends() {
        tokio::time::pause();
        let order = Uuid::new_v4();
        let fix = Fixture::new(MockMarker::with_order(order));
        fix.backend
            .set_my_orders(vec![mk_order(order, OrderStatus::OutForDelivery)]);

        fix.spawn();
        settle().await;
        assert!(fix.marker.load().is_some());

        fix.backend
            .set_my_orders(vec![mk_order(order, OrderStatus::Delivered)]);
        tokio::time::sleep(REFRESH).await;
        settle().await;

        assert_eq!(fix.marker.load(), None, "Marker survived a delivered order");
        assert!(fix.location.watch_cleared(), "Device watch survived");

        let sends = fix.backend.location_send_attempts();
        tokio::time::sleep(SEND * 5).await;
        settle().await;
        assert_eq!(
            fix.backend.location_send_attempts(),
            sends,
            "Location sends continued after the order was delivered"
        );
    }

    #[test]
    async fn test_cancelled_order_clears_marker() {
        tokio::time::pause();
        let order = Uuid::new_v4();
        let fix = Fixture::new(MockMarker::with_order(order));
        fix.backend
            .set_my_orders(vec![mk_order(order, OrderStatus::Cancelled)]);

        fix.spawn();
        settle().await;
        tokio::time::sleep(REFRESH).await;
        settle().await;

        assert_eq!(fix.marker.load(), None);
        assert_eq!(
            fix.session.ui_state().await.tracking,
            TrackingStatus::Idle,
            "Tracker slot was not cleared"
        );
    }

    #[test]
    async fn test_start_tracking_replaces_previous_order() {
        tokio::time::pause();
        let fix = Fixture::new(MockMarker::default());
        fix.spawn();
        settle().await;

        let first = Uuid::new_v4();
        fix.session.start_tracking(first).await;
        settle().await;
        assert_eq!(fix.marker.load(), Some(first));

        let second = Uuid::new_v4();
        fix.session.start_tracking(second).await;
        settle().await;

        // One marker per session
        assert_eq!(fix.marker.load(), Some(second));
        assert_eq!(
            fix.session.ui_state().await.tracked_order,
            Some(second),
        );
    }

    #[test]
    async fn test_explicit_stop_clears_everything() {
        tokio::time::pause();
        let order = Uuid::new_v4();
        let fix = Fixture::new(MockMarker::with_order(order));
        fix.backend
            .set_my_orders(vec![mk_order(order, OrderStatus::Preparing)]);

        fix.spawn();
        settle().await;

        fix.session.stop_tracking().await;
        settle().await;

        assert_eq!(fix.marker.load(), None);
        assert!(fix.location.watch_cleared());
        assert_eq!(fix.session.ui_state().await.tracking, TrackingStatus::Idle);
    }

    #[test]
    async fn test_quit_tears_down_tracker() {
        tokio::time::pause();
        let order = Uuid::new_v4();
        let fix = Fixture::new(MockMarker::with_order(order));
        fix.backend
            .set_my_orders(vec![mk_order(order, OrderStatus::Preparing)]);

        fix.spawn();
        settle().await;
        assert!(fix.location.watch_started());

        fix.session.quit();
        settle().await;

        assert!(fix.location.watch_cleared(), "Unmount left the watch alive");
        let sends = fix.backend.location_send_attempts();
        tokio::time::sleep(SEND * 5).await;
        settle().await;
        assert_eq!(fix.backend.location_send_attempts(), sends);
    }

    #[test]
    async fn test_orders_sorted_newest_first() {
        tokio::time::pause();
        let fix = Fixture::new(MockMarker::default());
        let old = mk_order(Uuid::new_v4(), OrderStatus::Delivered);
        let mut new = mk_order(Uuid::new_v4(), OrderStatus::Pending);
        new.placed_at += chrono::Duration::minutes(5);
        fix.backend.set_my_orders(vec![old.clone(), new.clone()]);

        fix.spawn();
        settle().await;

        let state = fix.session.ui_state().await;
        assert_eq!(
            state.orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![new.id, old.id],
        );
    }
}
