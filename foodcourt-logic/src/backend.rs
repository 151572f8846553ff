use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    model::{Cart, CartItem, CustomerProfile, LiveOrder, MenuItem, Order, OrderStatus, UserRole},
    prelude::*,
};

/// Everything needed to place an order from the current cart.
#[derive(Debug, Clone, Serialize, Deserialize, specta::Type)]
pub struct PlaceOrder {
    pub delivery_address: String,
    pub user_notes: String,
    pub customer_name: String,
    pub customer_phone: String,
}

/// Typed contract with the remote data store. The store's internals are out
/// of scope, the client only consumes these request/response operations.
pub trait Backend: Send + Sync + 'static {
    fn fetch_menu(&self) -> impl Future<Output = Result<Vec<MenuItem>>> + Send;
    /// Admin only
    fn add_menu_item(&self, item: MenuItem) -> impl Future<Output = Result> + Send;
    /// Admin only
    fn delete_menu_item(&self, id: Uuid) -> impl Future<Output = Result> + Send;

    fn fetch_cart(&self) -> impl Future<Output = Result<Cart>> + Send;
    fn add_to_cart(&self, item: CartItem) -> impl Future<Output = Result> + Send;
    fn remove_from_cart(&self, menu_item: Uuid) -> impl Future<Output = Result> + Send;
    fn clear_cart(&self) -> impl Future<Output = Result> + Send;

    /// Place an order from the caller's cart, returns the new order's id.
    fn place_order(&self, order: PlaceOrder) -> impl Future<Output = Result<Uuid>> + Send;
    fn fetch_my_orders(&self) -> impl Future<Output = Result<Vec<Order>>> + Send;
    /// Admin only: all orders that have not reached a terminal status.
    fn fetch_active_orders(&self) -> impl Future<Output = Result<Vec<LiveOrder>>> + Send;
    /// Admin only
    fn update_order_status(
        &self,
        order: Uuid,
        status: OrderStatus,
    ) -> impl Future<Output = Result> + Send;
    /// Best-effort "latest wins" position update for an active order. Callers
    /// treat this as fire-and-forget.
    fn update_order_location(
        &self,
        order: Uuid,
        lat: f64,
        long: f64,
    ) -> impl Future<Output = Result> + Send;

    fn fetch_profile(&self) -> impl Future<Output = Result<Option<CustomerProfile>>> + Send;
    fn save_profile(&self, profile: CustomerProfile) -> impl Future<Output = Result> + Send;

    fn caller_role(&self) -> impl Future<Output = Result<UserRole>> + Send;
}
