mod location;
mod marker;
mod notify;
mod state;

use foodcourt_logic::{
    Backend, Cart, CartItem, CustomerProfile, LiveOrder, MenuItem, OrderStatus, OrdersUiState,
    PlaceOrder,
};
use foodcourt_remote::HttpBackend;
use log::LevelFilter;
use std::sync::Arc;
use tauri::{AppHandle, Manager, State};
use tauri_specta::{ErrorHandlingMode, collect_commands, collect_events};
use tokio::sync::RwLock;
use uuid::Uuid;

use std::result::Result as StdResult;

use crate::state::{
    AppScreen, AppState, AppStateHandle, ChangeScreen, LiveOrdersStateUpdate, OrdersStateUpdate,
};

type Result<T = (), E = String> = StdResult<T, E>;

type BackendHandle<'a> = State<'a, Arc<HttpBackend>>;

fn stringify(err: anyhow::Error) -> String {
    err.to_string()
}

// == GENERAL / FLOW COMMANDS ==

#[tauri::command]
#[specta::specta]
/// Get the screen the app should currently be on, returns [AppScreen]
async fn get_current_screen(state: State<'_, AppStateHandle>) -> Result<AppScreen> {
    let state = state.read().await;
    Ok(match &*state {
        AppState::Setup => AppScreen::Setup,
        AppState::Menu(_profile) => AppScreen::Menu,
        AppState::Orders(_session) => AppScreen::Orders,
        AppState::LiveOrders(_feed) => AppScreen::LiveOrders,
        AppState::AccessDenied => AppScreen::AccessDenied,
    })
}

#[tauri::command]
#[specta::specta]
/// Leave the orders screen or the live dashboard and go back to the menu
async fn quit_to_menu(
    app: AppHandle,
    backend: BackendHandle<'_>,
    state: State<'_, AppStateHandle>,
) -> Result {
    let mut state = state.write().await;
    state.quit_to_menu(app, backend.inner().clone()).await;
    Ok(())
}

// == AppState::Setup COMMANDS ==

#[tauri::command]
#[specta::specta]
/// (Screen: Setup) Save the customer's profile and go to the menu screen
async fn complete_setup(
    profile: CustomerProfile,
    app: AppHandle,
    backend: BackendHandle<'_>,
    state: State<'_, AppStateHandle>,
) -> Result {
    state
        .write()
        .await
        .complete_setup(&app, backend.inner().clone(), profile)
        .await
}

// == AppState::Menu COMMANDS ==

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Get the customer's profile
async fn get_profile(state: State<'_, AppStateHandle>) -> Result<CustomerProfile> {
    let state = state.read().await;
    let profile = state.get_menu()?;
    Ok(profile.clone())
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Update the customer's profile and persist it
async fn update_profile(
    new_profile: CustomerProfile,
    backend: BackendHandle<'_>,
    state: State<'_, AppStateHandle>,
) -> Result {
    backend
        .save_profile(new_profile.clone())
        .await
        .map_err(stringify)?;
    let mut state = state.write().await;
    let profile = state.get_menu_mut()?;
    *profile = new_profile;
    Ok(())
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Check if the caller may open the live-orders dashboard
async fn is_admin(backend: BackendHandle<'_>) -> Result<bool> {
    let role = backend.caller_role().await.map_err(stringify)?;
    Ok(role.is_admin())
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Get the restaurant's menu
async fn get_menu_items(backend: BackendHandle<'_>) -> Result<Vec<MenuItem>> {
    backend.fetch_menu().await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) ADMIN ONLY: Add an item to the menu
async fn admin_add_menu_item(item: MenuItem, backend: BackendHandle<'_>) -> Result {
    backend.add_menu_item(item).await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) ADMIN ONLY: Remove an item from the menu
async fn admin_delete_menu_item(id: Uuid, backend: BackendHandle<'_>) -> Result {
    backend.delete_menu_item(id).await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Get the caller's cart
async fn get_cart(backend: BackendHandle<'_>) -> Result<Cart> {
    backend.fetch_cart().await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Add a menu item to the cart
async fn add_to_cart(item: CartItem, backend: BackendHandle<'_>) -> Result {
    backend.add_to_cart(item).await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Remove a menu item from the cart
async fn remove_from_cart(menu_item: Uuid, backend: BackendHandle<'_>) -> Result {
    backend.remove_from_cart(menu_item).await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Empty the cart
async fn clear_cart(backend: BackendHandle<'_>) -> Result {
    backend.clear_cart().await.map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Place an order from the current cart. Switches to the
/// orders screen and starts sharing the device's live location for the new
/// order. Returns the new order's id.
async fn place_order(
    order: PlaceOrder,
    app: AppHandle,
    backend: BackendHandle<'_>,
    state: State<'_, AppStateHandle>,
) -> Result<Uuid> {
    let mut state = state.write().await;
    // Nothing is placed remotely unless the screen switch can follow
    state.get_menu()?;
    let id = backend.place_order(order).await.map_err(stringify)?;
    state.open_orders(app, backend.inner().clone()).await;
    let session = state.get_orders()?;
    session.start_tracking(id).await;
    Ok(id)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Go to the orders screen. Resumes live tracking if an
/// active order's marker is still present.
async fn open_orders(
    app: AppHandle,
    backend: BackendHandle<'_>,
    state: State<'_, AppStateHandle>,
) -> Result {
    let mut state = state.write().await;
    state.open_orders(app, backend.inner().clone()).await;
    Ok(())
}

#[tauri::command]
#[specta::specta]
/// (Screen: Menu) Go to the live-orders dashboard. Non-admins land on the
/// access-denied screen instead.
async fn open_live_orders(
    app: AppHandle,
    backend: BackendHandle<'_>,
    state: State<'_, AppStateHandle>,
) -> Result {
    let mut state = state.write().await;
    state.open_live_orders(app, backend.inner().clone()).await;
    Ok(())
}

// == AppState::Orders COMMANDS ==

#[tauri::command]
#[specta::specta]
/// (Screen: Orders) Get the caller's orders and tracking status, call after
/// receiving an update event
async fn get_orders_state(state: State<'_, AppStateHandle>) -> Result<OrdersUiState> {
    let session = state.read().await.get_orders()?;
    Ok(session.ui_state().await)
}

#[tauri::command]
#[specta::specta]
/// (Screen: Orders) Stop sharing the device's location for the active order
async fn stop_location_sharing(state: State<'_, AppStateHandle>) -> Result {
    let session = state.read().await.get_orders()?;
    session.stop_tracking().await;
    Ok(())
}

// == AppState::LiveOrders COMMANDS ==

#[tauri::command]
#[specta::specta]
/// (Screen: LiveOrders) Get all active orders with their latest customer
/// positions, call after receiving an update event
async fn get_live_orders(state: State<'_, AppStateHandle>) -> Result<Vec<LiveOrder>> {
    let feed = state.read().await.get_live_orders()?;
    Ok(feed.orders().await)
}

#[tauri::command]
#[specta::specta]
/// (Screen: LiveOrders) ADMIN ONLY: Move an order to a new status
async fn set_order_status(
    order: Uuid,
    status: OrderStatus,
    backend: BackendHandle<'_>,
) -> Result {
    backend
        .update_order_status(order, status)
        .await
        .map_err(stringify)
}

#[tauri::command]
#[specta::specta]
/// (Screen: LiveOrders) ADMIN ONLY: Cancel an active order
async fn cancel_order(order: Uuid, backend: BackendHandle<'_>) -> Result {
    backend
        .update_order_status(order, OrderStatus::Cancelled)
        .await
        .map_err(stringify)
}

pub fn mk_specta() -> tauri_specta::Builder {
    tauri_specta::Builder::<tauri::Wry>::new()
        .error_handling(ErrorHandlingMode::Throw)
        .commands(collect_commands![
            get_current_screen,
            quit_to_menu,
            complete_setup,
            get_profile,
            update_profile,
            is_admin,
            get_menu_items,
            admin_add_menu_item,
            admin_delete_menu_item,
            get_cart,
            add_to_cart,
            remove_from_cart,
            clear_cart,
            place_order,
            open_orders,
            open_live_orders,
            get_orders_state,
            stop_location_sharing,
            get_live_orders,
            set_order_status,
            cancel_order,
        ])
        .events(collect_events![
            ChangeScreen,
            OrdersStateUpdate,
            LiveOrdersStateUpdate
        ])
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let backend = Arc::new(HttpBackend::new().expect("Couldn't build the API client"));
    let state = RwLock::new(AppState::Setup);

    let builder = mk_specta();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_notification::init())
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(LevelFilter::Debug)
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_geolocation::init())
        .plugin(tauri_plugin_store::Builder::default().build())
        .invoke_handler(builder.invoke_handler())
        .manage(backend)
        .manage(state)
        .setup(move |app| {
            builder.mount_events(app);

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let backend = handle.state::<Arc<HttpBackend>>();
                match backend.fetch_profile().await {
                    Ok(Some(profile)) => {
                        let state_handle = handle.state::<AppStateHandle>();
                        let mut state = state_handle.write().await;
                        *state = AppState::Menu(profile);
                    }
                    Ok(None) => {}
                    Err(why) => {
                        log::warn!("Couldn't restore the customer profile: {why:?}");
                    }
                }
            });
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
