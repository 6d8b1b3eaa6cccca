//! Change notifications for connected admin clients.
//!
//! Handlers publish through the [`Notifier`] in application state. With the
//! realtime channel enabled that is a [`Hub`] fanning out to websocket
//! sessions; otherwise it is [`NoopNotifier`]. Delivery is best effort:
//! clients that are not connected at publish time never see the event.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Games,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub resource: Resource,
    pub action: Action,
    pub id: i64,
    pub data: Option<Value>,
}

impl Notification {
    pub fn created(resource: Resource, id: i64, record: &impl Serialize) -> Self {
        Self::with_record(resource, Action::Created, id, record)
    }

    pub fn updated(resource: Resource, id: i64, record: &impl Serialize) -> Self {
        Self::with_record(resource, Action::Updated, id, record)
    }

    pub fn deleted(resource: Resource, id: i64) -> Self {
        Self { resource, action: Action::Deleted, id, data: None }
    }

    fn with_record(resource: Resource, action: Action, id: i64, record: &impl Serialize) -> Self {
        let data = match serde_json::to_value(record) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "could not serialize notification payload");
                None
            }
        };
        Self { resource, action, id, data }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, notification: Notification) {
        debug!(
            resource = ?notification.resource,
            action = ?notification.action,
            "realtime disabled, dropping notification"
        );
    }
}

/// Broadcast registry of connected realtime clients.
#[derive(Clone)]
pub struct Hub {
    tx: broadcast::Sender<Notification>,
}

impl Hub {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Notifier for Hub {
    fn notify(&self, notification: Notification) {
        match self.tx.send(notification) {
            Ok(receivers) => debug!(receivers, "notification published"),
            Err(_) => debug!("no realtime clients connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_notifications() {
        let hub = Hub::new(8);
        let mut rx = hub.subscribe();
        hub.notify(Notification::created(Resource::Games, 1, &json!({ "name": "Derby" })));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.action, Action::Created);
        assert_eq!(received.data, Some(json!({ "name": "Derby" })));
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let hub = Hub::new(8);
        hub.notify(Notification::deleted(Resource::Users, 4));
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn wire_shape_is_lowercase() {
        let value = serde_json::to_value(Notification::deleted(Resource::Users, 4)).unwrap();
        assert_eq!(
            value,
            json!({ "resource": "users", "action": "deleted", "id": 4, "data": null })
        );
    }
}
