use foodcourt_logic::Notifier;
use log::error;
use tauri::AppHandle;
use tauri_plugin_notification::NotificationExt;

/// Raises system notifications for the admin dashboard.
pub struct TauriNotifier {
    app: AppHandle,
}

impl TauriNotifier {
    pub fn new(app: &AppHandle) -> Self {
        Self { app: app.clone() }
    }
}

impl Notifier for TauriNotifier {
    fn notify_new_orders(&self, count: usize) {
        let body = if count == 1 {
            "1 new order placed.".to_string()
        } else {
            format!("{count} new orders placed.")
        };
        if let Err(why) = self
            .app
            .notification()
            .builder()
            .title("New order received!")
            .body(body)
            .show()
        {
            error!("Failed to show new-order notification: {why:?}");
        }
    }
}
