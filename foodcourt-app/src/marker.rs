use foodcourt_logic::MarkerStore;
use tauri::AppHandle;
use tauri_plugin_store::StoreExt;
use uuid::Uuid;

const STORE_NAME: &str = "session";
const ACTIVE_ORDER_KEY: &str = "active_order";

/// Session-scoped active-order marker, persisted through the store plugin so
/// a reload resumes tracking.
#[derive(Clone)]
pub struct StoreMarker {
    app: AppHandle,
}

impl StoreMarker {
    pub fn new(app: &AppHandle) -> Self {
        Self { app: app.clone() }
    }
}

impl MarkerStore for StoreMarker {
    fn load(&self) -> Option<Uuid> {
        let store = self.app.store(STORE_NAME).expect("Couldn't create store");
        let order = store
            .get(ACTIVE_ORDER_KEY)
            .and_then(|v| serde_json::from_value::<Uuid>(v).ok());
        store.close_resource();
        order
    }

    fn save(&self, order: Uuid) {
        let store = self.app.store(STORE_NAME).expect("Couldn't create store");
        let value = serde_json::to_value(order).expect("Failed to serialize");
        store.set(ACTIVE_ORDER_KEY, value);
    }

    fn clear(&self) {
        let store = self.app.store(STORE_NAME).expect("Couldn't create store");
        store.delete(ACTIVE_ORDER_KEY);
    }
}
