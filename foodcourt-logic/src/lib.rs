mod backend;
mod location;
mod model;
mod orders_feed;
mod session;
#[cfg(test)]
mod tests;
mod tracker;

pub use backend::{Backend, PlaceOrder};
pub use location::{LocationError, LocationService, Position, WatchEvent};
pub use model::{
    Cart, CartItem, CustomerProfile, LiveOrder, MenuItem, Order, OrderLine, OrderStatus, UserRole,
    UtcDT,
};
pub use orders_feed::{LiveOrdersFeed, Notifier};
pub use session::{MarkerStore, OrderSession, OrdersUiState};
pub use tracker::{LocationTracker, StateUpdateSender, TrackingStatus};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
