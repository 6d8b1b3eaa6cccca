use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::AuthKeys;
use crate::notify::{Hub, NoopNotifier, Notification, Notifier};

/// Handles shared by every handler. Built once at boot and injected into
/// the router.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub auth: Arc<AuthKeys>,
    pub notifier: Arc<dyn Notifier>,
    /// Present only when the realtime channel is enabled.
    pub hub: Option<Hub>,
}

impl AppState {
    pub fn new(pool: SqlitePool, auth: AuthKeys, hub: Option<Hub>) -> Self {
        let notifier: Arc<dyn Notifier> = match &hub {
            Some(hub) => Arc::new(hub.clone()),
            None => Arc::new(NoopNotifier),
        };
        Self { pool, auth: Arc::new(auth), notifier, hub }
    }

    pub fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }
}
