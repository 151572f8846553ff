use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex as StdMutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::anyhow;
use chrono::Utc;
use tokio::{sync::mpsc, task::yield_now};
use uuid::Uuid;

use crate::{
    StateUpdateSender,
    backend::{Backend, PlaceOrder},
    location::{LocationError, LocationService, Position, WatchEvent},
    model::{Cart, CartItem, CustomerProfile, LiveOrder, MenuItem, Order, OrderStatus, UserRole},
    orders_feed::Notifier,
    prelude::*,
    session::MarkerStore,
};

/// Let spawned loops run until they are blocked again. A paused-clock
/// interval's first deadline is rounded up past the frozen now, so after the
/// tasks are parked the clock is nudged one millisecond to fire any timer
/// that is already due, then the tasks get to run again.
pub async fn settle() {
    for _ in 0..10 {
        yield_now().await;
    }
    tokio::time::advance(Duration::from_millis(1)).await;
    for _ in 0..10 {
        yield_now().await;
    }
}

pub fn pos(lat: f64, long: f64) -> Position {
    Position {
        lat,
        long,
        captured_at: Utc::now(),
    }
}

pub fn mk_order(id: Uuid, status: OrderStatus) -> Order {
    Order {
        id,
        customer_name: "Test Customer".into(),
        customer_phone: "555-0100".into(),
        delivery_address: "1 Test Street".into(),
        user_notes: String::new(),
        items: vec![],
        total_price: 250,
        placed_at: Utc::now(),
        status,
    }
}

pub fn mk_live() -> LiveOrder {
    LiveOrder {
        order_id: Uuid::new_v4(),
        customer_name: "Test Customer".into(),
        customer_phone: "555-0100".into(),
        delivery_address: "1 Test Street".into(),
        items: vec![],
        total_price: 250,
        placed_at: Utc::now(),
        status: OrderStatus::Pending,
        current_position: None,
        last_location_update: None,
    }
}

#[derive(Default)]
pub struct MockBackend {
    my_orders: StdMutex<Vec<Order>>,
    active_polls: StdMutex<VecDeque<Result<Vec<LiveOrder>, String>>>,
    last_active: StdMutex<Vec<LiveOrder>>,
    active_poll_count: AtomicUsize,
    location_sends: StdMutex<Vec<(Uuid, f64, f64)>>,
    location_send_attempts: AtomicUsize,
    fail_location_sends: AtomicBool,
}

impl MockBackend {
    pub fn set_my_orders(&self, orders: Vec<Order>) {
        *self.my_orders.lock().unwrap() = orders;
    }

    /// Script the result of the next active-orders poll. Once the script is
    /// exhausted, further polls repeat the last successful result.
    pub fn push_active_poll(&self, result: Result<Vec<LiveOrder>, String>) {
        self.active_polls.lock().unwrap().push_back(result);
    }

    pub fn active_poll_count(&self) -> usize {
        self.active_poll_count.load(Ordering::SeqCst)
    }

    pub fn location_sends(&self) -> Vec<(Uuid, f64, f64)> {
        self.location_sends.lock().unwrap().clone()
    }

    pub fn location_send_attempts(&self) -> usize {
        self.location_send_attempts.load(Ordering::SeqCst)
    }

    pub fn fail_location_sends(&self, fail: bool) {
        self.fail_location_sends.store(fail, Ordering::SeqCst);
    }
}

impl Backend for MockBackend {
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>> {
        Ok(vec![])
    }

    async fn add_menu_item(&self, _item: MenuItem) -> Result {
        Ok(())
    }

    async fn delete_menu_item(&self, _id: Uuid) -> Result {
        Ok(())
    }

    async fn fetch_cart(&self) -> Result<Cart> {
        Ok(vec![])
    }

    async fn add_to_cart(&self, _item: CartItem) -> Result {
        Ok(())
    }

    async fn remove_from_cart(&self, _menu_item: Uuid) -> Result {
        Ok(())
    }

    async fn clear_cart(&self) -> Result {
        Ok(())
    }

    async fn place_order(&self, _order: PlaceOrder) -> Result<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn fetch_my_orders(&self) -> Result<Vec<Order>> {
        Ok(self.my_orders.lock().unwrap().clone())
    }

    async fn fetch_active_orders(&self) -> Result<Vec<LiveOrder>> {
        self.active_poll_count.fetch_add(1, Ordering::SeqCst);
        let scripted = self.active_polls.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(orders)) => {
                *self.last_active.lock().unwrap() = orders.clone();
                Ok(orders)
            }
            Some(Err(why)) => Err(anyhow!(why)),
            None => Ok(self.last_active.lock().unwrap().clone()),
        }
    }

    async fn update_order_status(&self, _order: Uuid, _status: OrderStatus) -> Result {
        Ok(())
    }

    async fn update_order_location(&self, order: Uuid, lat: f64, long: f64) -> Result {
        self.location_send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_location_sends.load(Ordering::SeqCst) {
            Err(anyhow!("simulated send failure"))
        } else {
            self.location_sends.lock().unwrap().push((order, lat, long));
            Ok(())
        }
    }

    async fn fetch_profile(&self) -> Result<Option<CustomerProfile>> {
        Ok(None)
    }

    async fn save_profile(&self, _profile: CustomerProfile) -> Result {
        Ok(())
    }

    async fn caller_role(&self) -> Result<UserRole> {
        Ok(UserRole::User)
    }
}

struct MockLocationInner {
    fix: StdMutex<Result<Position, LocationError>>,
    watch_tx: StdMutex<Option<mpsc::Sender<WatchEvent>>>,
}

#[derive(Clone)]
pub struct MockLocation {
    inner: Arc<MockLocationInner>,
}

impl MockLocation {
    pub fn with_fix(fix: Position) -> Self {
        Self {
            inner: Arc::new(MockLocationInner {
                fix: StdMutex::new(Ok(fix)),
                watch_tx: StdMutex::new(None),
            }),
        }
    }

    pub fn failing(err: LocationError) -> Self {
        Self {
            inner: Arc::new(MockLocationInner {
                fix: StdMutex::new(Err(err)),
                watch_tx: StdMutex::new(None),
            }),
        }
    }

    fn sender(&self) -> mpsc::Sender<WatchEvent> {
        self.inner
            .watch_tx
            .lock()
            .unwrap()
            .clone()
            .expect("No watch active")
    }

    pub async fn push(&self, pos: Position) {
        self.sender().send(Ok(pos)).await.expect("Watch closed");
    }

    pub async fn push_err(&self, err: LocationError) {
        self.sender().send(Err(err)).await.expect("Watch closed");
    }

    pub fn watch_started(&self) -> bool {
        self.inner.watch_tx.lock().unwrap().is_some()
    }

    /// True once the tracker has dropped its watch receiver.
    pub fn watch_cleared(&self) -> bool {
        self.inner
            .watch_tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.is_closed())
    }
}

impl LocationService for MockLocation {
    async fn request_position(&self) -> Result<Position, LocationError> {
        self.inner.fix.lock().unwrap().clone()
    }

    async fn watch_position(&self) -> Result<mpsc::Receiver<WatchEvent>, LocationError> {
        let (tx, rx) = mpsc::channel(8);
        *self.inner.watch_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

#[derive(Clone, Default)]
pub struct MockMarker(Arc<StdMutex<Option<Uuid>>>);

impl MockMarker {
    pub fn with_order(order: Uuid) -> Self {
        Self(Arc::new(StdMutex::new(Some(order))))
    }
}

impl MarkerStore for MockMarker {
    fn load(&self) -> Option<Uuid> {
        *self.0.lock().unwrap()
    }

    fn save(&self, order: Uuid) {
        *self.0.lock().unwrap() = Some(order);
    }

    fn clear(&self) {
        *self.0.lock().unwrap() = None;
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier(Arc<StdMutex<Vec<usize>>>);

impl RecordingNotifier {
    pub fn counts(&self) -> Vec<usize> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_new_orders(&self, count: usize) {
        self.0.lock().unwrap().push(count);
    }
}

#[derive(Clone)]
pub struct DummySender;

impl StateUpdateSender for DummySender {
    fn send_update(&self) {}
}

#[tokio::test]
async fn test_settle_wakes_due_timers() {
    tokio::time::pause();
    let handle = tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;
    });

    settle().await;

    assert!(
        handle.is_finished(),
        "An interval's immediate first tick did not fire during settle()"
    );
}
