use std::{marker::PhantomData, sync::Arc, time::Duration};

use foodcourt_logic::{Backend, CustomerProfile, LiveOrdersFeed, OrderSession, StateUpdateSender};
use foodcourt_remote::HttpBackend;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_specta::Event;
use tokio::sync::RwLock;

use crate::{
    Result, location::TauriLocation, marker::StoreMarker, notify::TauriNotifier,
};

/// The customer's order list or tracking status has changed
#[derive(Serialize, Deserialize, Clone, Default, Debug, specta::Type, tauri_specta::Event)]
pub struct OrdersStateUpdate;

/// The admin's live-orders list has changed
#[derive(Serialize, Deserialize, Clone, Default, Debug, specta::Type, tauri_specta::Event)]
pub struct LiveOrdersStateUpdate;

pub struct TauriStateUpdateSender<E: Clone + Default + Event + Serialize + Send + Sync + 'static>(
    AppHandle,
    PhantomData<E>,
);

impl<E: Serialize + Clone + Default + Event + Send + Sync + 'static> TauriStateUpdateSender<E> {
    fn new(app: &AppHandle) -> Self {
        Self(app.clone(), PhantomData)
    }
}

impl<E: Serialize + Clone + Default + Event + Send + Sync + 'static> Clone
    for TauriStateUpdateSender<E>
{
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<E: Serialize + Clone + Default + Event + Send + Sync + 'static> StateUpdateSender
    for TauriStateUpdateSender<E>
{
    fn send_update(&self) {
        if let Err(why) = E::default().emit(&self.0) {
            error!("Error sending state update to UI: {why:?}");
        }
    }
}

pub type Session = OrderSession<
    TauriLocation,
    HttpBackend,
    TauriStateUpdateSender<OrdersStateUpdate>,
    StoreMarker,
>;
pub type Feed = LiveOrdersFeed<HttpBackend, TauriStateUpdateSender<LiveOrdersStateUpdate>, TauriNotifier>;

pub enum AppState {
    Setup,
    Menu(CustomerProfile),
    Orders(Arc<Session>),
    LiveOrders(Arc<Feed>),
    AccessDenied,
}

#[derive(Serialize, Deserialize, specta::Type, Debug, Clone, Eq, PartialEq)]
pub enum AppScreen {
    Setup,
    Menu,
    Orders,
    LiveOrders,
    AccessDenied,
}

pub type AppStateHandle = RwLock<AppState>;

const ORDER_REFRESH_RATE: Duration = Duration::from_secs(3);
const LOCATION_SEND_RATE: Duration = Duration::from_secs(1);
const LIVE_ORDERS_POLL_RATE: Duration = Duration::from_secs(1);

/// The app is changing screens, contains the screen it's switching to
#[derive(Serialize, Deserialize, Clone, Debug, specta::Type, tauri_specta::Event)]
pub struct ChangeScreen(AppScreen);

fn error_dialog(app: &AppHandle, msg: &str) {
    app.dialog()
        .message(msg)
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

impl AppState {
    pub fn get_menu(&self) -> Result<&CustomerProfile> {
        match self {
            AppState::Menu(profile) => Ok(profile),
            _ => Err("Not on menu screen".to_string()),
        }
    }

    pub fn get_menu_mut(&mut self) -> Result<&mut CustomerProfile> {
        match self {
            AppState::Menu(profile) => Ok(profile),
            _ => Err("Not on menu screen".to_string()),
        }
    }

    pub fn get_orders(&self) -> Result<Arc<Session>> {
        if let AppState::Orders(session) = self {
            Ok(session.clone())
        } else {
            Err("Not on orders screen".to_string())
        }
    }

    pub fn get_live_orders(&self) -> Result<Arc<Feed>> {
        if let AppState::LiveOrders(feed) = self {
            Ok(feed.clone())
        } else {
            Err("Not on live orders screen".to_string())
        }
    }

    fn emit_screen_change(app: &AppHandle, screen: AppScreen) {
        if let Err(why) = ChangeScreen(screen).emit(app) {
            warn!("Error emitting screen change: {why:?}");
        }
    }

    pub async fn complete_setup(
        &mut self,
        app: &AppHandle,
        backend: Arc<HttpBackend>,
        profile: CustomerProfile,
    ) -> Result {
        if let AppState::Setup = self {
            backend
                .save_profile(profile.clone())
                .await
                .map_err(|why| why.to_string())?;
            *self = AppState::Menu(profile);
            Self::emit_screen_change(app, AppScreen::Menu);
            Ok(())
        } else {
            Err("Must be on the Setup screen".to_string())
        }
    }

    /// Go to the customer's orders screen. The session loop runs until the
    /// user quits back to the menu.
    pub async fn open_orders(&mut self, app: AppHandle, backend: Arc<HttpBackend>) {
        if let AppState::Menu(_) = self {
            let location = TauriLocation::new(app.clone());
            let marker = StoreMarker::new(&app);
            let state_updates = TauriStateUpdateSender::new(&app);
            let session = Arc::new(Session::new(
                backend,
                location,
                marker,
                state_updates,
                ORDER_REFRESH_RATE,
                LOCATION_SEND_RATE,
            ));
            *self = AppState::Orders(session.clone());
            Self::orders_loop(session);
            Self::emit_screen_change(&app, AppScreen::Orders);
        }
    }

    fn orders_loop(session: Arc<Session>) {
        tokio::spawn(async move {
            session.main_loop().await;
            info!("Orders session ended");
        });
    }

    /// Go to the admin live-orders dashboard. A non-admin caller is bounced
    /// to the access-denied screen without a polling loop ever starting.
    pub async fn open_live_orders(&mut self, app: AppHandle, backend: Arc<HttpBackend>) {
        if let AppState::Menu(_) = self {
            let role = match backend.caller_role().await {
                Ok(role) => role,
                Err(why) => {
                    error_dialog(&app, &format!("Couldn't verify your access\n\n{why:?}"));
                    return;
                }
            };
            if !role.is_admin() {
                *self = AppState::AccessDenied;
                Self::emit_screen_change(&app, AppScreen::AccessDenied);
                return;
            }

            let state_updates = TauriStateUpdateSender::new(&app);
            let notifier = TauriNotifier::new(&app);
            let feed = Arc::new(Feed::new(
                backend,
                state_updates,
                notifier,
                LIVE_ORDERS_POLL_RATE,
            ));
            *self = AppState::LiveOrders(feed.clone());
            Self::feed_loop(feed);
            Self::emit_screen_change(&app, AppScreen::LiveOrders);
        }
    }

    fn feed_loop(feed: Arc<Feed>) {
        tokio::spawn(async move {
            feed.main_loop().await;
            info!("Live orders feed stopped");
        });
    }

    pub async fn quit_to_menu(&mut self, app: AppHandle, backend: Arc<HttpBackend>) {
        match self {
            AppState::Setup => return,
            AppState::Menu(_) => {
                warn!("Already on menu!");
                return;
            }
            AppState::Orders(session) => session.quit(),
            AppState::LiveOrders(feed) => feed.stop(),
            AppState::AccessDenied => {}
        }

        let profile = match backend.fetch_profile().await {
            Ok(profile) => profile,
            Err(why) => {
                warn!("Failed to fetch profile: {why:?}");
                None
            }
        };
        let screen = if let Some(profile) = profile {
            *self = AppState::Menu(profile);
            AppScreen::Menu
        } else {
            *self = AppState::Setup;
            AppScreen::Setup
        };

        Self::emit_screen_change(&app, screen);
    }
}
