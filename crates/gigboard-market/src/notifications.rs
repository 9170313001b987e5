use crate::store::MarketStore;
use crate::types::{Notification, NotificationKind};
use chrono::Utc;
use gigboard_types::{NotificationId, Result, UserId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Events buffered for slow subscribers before old ones are dropped.
const EVENT_BUFFER: usize = 256;

/// Creates, stores and fans out notifications.
///
/// Every notification is appended to the store for listing and broadcast to
/// any live subscriber (the node's toast forwarder). A missing or lagging
/// subscriber never fails the producing operation.
pub struct NotificationCenter {
    store: Arc<dyn MarketStore>,
    events: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { store, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    pub async fn notify(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        title: &str,
        body: String,
        payload: serde_json::Value,
    ) -> Result<Notification> {
        let notification = Notification {
            id: NotificationId::generate(),
            user_id,
            kind,
            title: title.to_string(),
            body,
            payload,
            read: false,
            created_at: Utc::now(),
        };

        self.store.push_notification(notification.clone()).await?;

        // send errors only when no subscriber is connected
        let _ = self.events.send(notification.clone());

        debug!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "🔔 Notification queued"
        );
        Ok(notification)
    }

    /// Notifications for a user, newest first.
    pub async fn list_for(&self, user_id: &UserId) -> Result<Vec<Notification>> {
        let mut notifications = self.store.list_notifications(user_id).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }
}
