use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::location::Position;

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

/// Lifecycle of an order. Owned by the remote store, the client only ever
/// holds read-through copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// A terminal order is no longer active and stops all tracking for it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// A single ordered line: which menu item, how many, and at what unit price
/// (smallest currency unit) the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub struct OrderLine {
    pub menu_item: Uuid,
    pub quantity: u32,
    pub unit_price: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub user_notes: String,
    pub items: Vec<OrderLine>,
    pub total_price: u64,
    pub placed_at: UtcDT,
    pub status: OrderStatus,
}

/// Admin projection of an active order, including the customer's last known
/// live position if they are sharing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct LiveOrder {
    pub order_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub items: Vec<OrderLine>,
    pub total_price: u64,
    pub placed_at: UtcDT,
    pub status: OrderStatus,
    pub current_position: Option<Position>,
    pub last_location_update: Option<UtcDT>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: u64,
    pub available: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub struct CartItem {
    pub menu_item: Uuid,
    pub quantity: u32,
    pub unit_price: u64,
}

pub type Cart = Vec<CartItem>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    Admin,
    User,
    #[default]
    Guest,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}
