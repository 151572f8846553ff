use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use foodcourt_logic::{
    Backend, Cart, CartItem, CustomerProfile, LiveOrder, MenuItem, Order, OrderStatus, PlaceOrder,
    UserRole, prelude::*,
};

use crate::server::endpoint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Serialize)]
struct LocationBody {
    lat: f64,
    long: f64,
}

/// [Backend] implementation over the remote store's HTTP API. All protocol
/// definition belongs to the remote side, this is only typed
/// request/response plumbing.
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(endpoint(path))
            .send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Server returned error")?;
        resp.json().await.context("Malformed response body")
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let mut req = self.client.request(method, endpoint(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Server returned error")
    }
}

impl Backend for HttpBackend {
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>> {
        self.get_json("/menu").await.context("Failed to fetch menu")
    }

    async fn add_menu_item(&self, item: MenuItem) -> Result {
        self.send_json(reqwest::Method::POST, "/menu", Some(&item))
            .await
            .context("Failed to add menu item")?;
        Ok(())
    }

    async fn delete_menu_item(&self, id: Uuid) -> Result {
        self.send_json::<()>(reqwest::Method::DELETE, &format!("/menu/{id}"), None)
            .await
            .context("Failed to delete menu item")?;
        Ok(())
    }

    async fn fetch_cart(&self) -> Result<Cart> {
        self.get_json("/cart").await.context("Failed to fetch cart")
    }

    async fn add_to_cart(&self, item: CartItem) -> Result {
        self.send_json(reqwest::Method::POST, "/cart/items", Some(&item))
            .await
            .context("Failed to add to cart")?;
        Ok(())
    }

    async fn remove_from_cart(&self, menu_item: Uuid) -> Result {
        self.send_json::<()>(
            reqwest::Method::DELETE,
            &format!("/cart/items/{menu_item}"),
            None,
        )
        .await
        .context("Failed to remove from cart")?;
        Ok(())
    }

    async fn clear_cart(&self) -> Result {
        self.send_json::<()>(reqwest::Method::DELETE, "/cart", None)
            .await
            .context("Failed to clear cart")?;
        Ok(())
    }

    async fn place_order(&self, order: PlaceOrder) -> Result<Uuid> {
        let resp = self
            .send_json(reqwest::Method::POST, "/orders", Some(&order))
            .await
            .context("Failed to place order")?;
        resp.json().await.context("Malformed order id in response")
    }

    async fn fetch_my_orders(&self) -> Result<Vec<Order>> {
        self.get_json("/orders/mine")
            .await
            .context("Failed to fetch orders")
    }

    async fn fetch_active_orders(&self) -> Result<Vec<LiveOrder>> {
        self.get_json("/orders/active")
            .await
            .context("Failed to fetch active orders")
    }

    async fn update_order_status(&self, order: Uuid, status: OrderStatus) -> Result {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/orders/{order}/status"),
            Some(&StatusBody { status }),
        )
        .await
        .context("Failed to update order status")?;
        Ok(())
    }

    async fn update_order_location(&self, order: Uuid, lat: f64, long: f64) -> Result {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/orders/{order}/location"),
            Some(&LocationBody { lat, long }),
        )
        .await
        .context("Failed to update order location")?;
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<Option<CustomerProfile>> {
        self.get_json("/profile")
            .await
            .context("Failed to fetch profile")
    }

    async fn save_profile(&self, profile: CustomerProfile) -> Result {
        self.send_json(reqwest::Method::PUT, "/profile", Some(&profile))
            .await
            .context("Failed to save profile")?;
        Ok(())
    }

    async fn caller_role(&self) -> Result<UserRole> {
        self.get_json("/role")
            .await
            .context("Failed to check caller role")
    }
}
