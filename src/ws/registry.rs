use std::collections::HashMap;

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};

use crate::db::DbId;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// One subscribed dashboard connection.
struct Subscriber {
    /// Owner of the private channel this connection listens on.
    user_id: DbId,
    sender: WsSender,
    connected_at: DateTime<Utc>,
}

/// Registry of live dashboard connections, grouped by user channel.
///
/// Created once at server start and shared as `Arc<ChannelRegistry>`; torn
/// down with [`ChannelRegistry::shutdown_all`] after the server stops.
pub struct ChannelRegistry {
    subscribers: RwLock<HashMap<String, Subscriber>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `conn_id` on the private channel of `user_id`.
    ///
    /// Returns the receiver the connection's writer task drains. Re-using a
    /// connection id replaces the previous registration.
    pub async fn subscribe(
        &self,
        conn_id: String,
        user_id: DbId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            user_id,
            sender: tx,
            connected_at: Utc::now(),
        };
        self.subscribers.write().await.insert(conn_id, subscriber);
        rx
    }

    pub async fn unsubscribe(&self, conn_id: &str) {
        if let Some(sub) = self.subscribers.write().await.remove(conn_id) {
            let connected_for = Utc::now() - sub.connected_at;
            tracing::debug!(
                conn_id,
                user_id = sub.user_id,
                connected_secs = connected_for.num_seconds(),
                "Subscriber removed"
            );
        }
    }

    /// Send `message` to every connection on `user_id`'s channel and nowhere else.
    ///
    /// Connections whose receivers are gone are skipped. Returns the number of
    /// connections the message was handed to.
    pub async fn publish(&self, user_id: DbId, message: Message) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers
            .values()
            .filter(|sub| sub.user_id == user_id)
            .filter(|sub| sub.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Number of live connections on one user's channel.
    pub async fn channel_size(&self, user_id: DbId) -> usize {
        self.subscribers
            .read()
            .await
            .values()
            .filter(|sub| sub.user_id == user_id)
            .count()
    }

    pub async fn connection_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the registry.
    pub async fn shutdown_all(&self) {
        let mut subscribers = self.subscribers.write().await;
        let count = subscribers.len();
        for sub in subscribers.values() {
            let _ = sub.sender.send(Message::Close(None));
        }
        subscribers.clear();
        tracing::info!(count, "Closed all dashboard connections");
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
