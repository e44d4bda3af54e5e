//! Real-time fan-out of committed predictions.
//!
//! Best-effort and at-most-once: a summary is handed to whoever is currently
//! subscribed to the owner's channel and is never queued or replayed. The
//! prediction row stays the source of truth for clients that missed it.

use std::sync::Arc;

use axum::extract::ws::Message;
use serde::Serialize;

use crate::db::DbId;
use crate::models::prediction::PredictionSummary;
use crate::ws::ChannelRegistry;

/// Event name carried in every prediction notification.
pub const PREDICTION_CREATED: &str = "prediction:created";

/// Name of a user's private channel.
pub fn channel_name(user_id: DbId) -> String {
    format!("user_{user_id}")
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    event: &'static str,
    channel: String,
    data: &'a PredictionSummary,
}

#[derive(Clone)]
pub struct PredictionNotifier {
    channels: Arc<ChannelRegistry>,
}

impl PredictionNotifier {
    pub fn new(channels: Arc<ChannelRegistry>) -> Self {
        Self { channels }
    }

    /// Publish `summary` to `user_id`'s channel.
    ///
    /// Never fails: problems are logged and the notification is dropped.
    /// Returns how many connections received it.
    pub async fn notify(&self, user_id: DbId, summary: &PredictionSummary) -> usize {
        let envelope = Envelope {
            event: PREDICTION_CREATED,
            channel: channel_name(user_id),
            data: summary,
        };

        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    user_id,
                    prediction_id = summary.id,
                    error = %e,
                    "dropping notification"
                );
                return 0;
            }
        };

        let delivered = self.channels.publish(user_id, Message::Text(text.into())).await;
        tracing::debug!(
            user_id,
            prediction_id = summary.id,
            delivered,
            "prediction notification published"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prediction::PredictionLabel;
    use chrono::Utc;

    fn summary(id: DbId) -> PredictionSummary {
        PredictionSummary {
            id,
            event_id: Some(1),
            label: PredictionLabel::Attack,
            confidence: 0.93,
            risk_score: Some(0.8),
            attack_detected: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn channel_names_are_per_user() {
        assert_eq!(channel_name(7), "user_7");
    }

    #[tokio::test]
    async fn notification_reaches_only_owner_channel() {
        let registry = Arc::new(ChannelRegistry::new());
        let mut owner = registry.subscribe("owner".into(), 7).await;
        let mut other = registry.subscribe("other".into(), 9).await;
        let notifier = PredictionNotifier::new(registry);

        let delivered = notifier.notify(7, &summary(42)).await;
        assert_eq!(delivered, 1);

        let Some(Message::Text(text)) = owner.recv().await else {
            panic!("owner should receive a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["event"], PREDICTION_CREATED);
        assert_eq!(value["channel"], "user_7");
        assert_eq!(value["data"]["id"], 42);
        assert_eq!(value["data"]["label"], "attack");

        assert!(other.try_recv().is_err(), "other users must not be notified");
    }

    #[tokio::test]
    async fn no_subscriber_means_nothing_is_queued() {
        let registry = Arc::new(ChannelRegistry::new());
        let notifier = PredictionNotifier::new(registry.clone());

        assert_eq!(notifier.notify(7, &summary(1)).await, 0);

        // A subscriber arriving later does not see the earlier notification.
        let mut late = registry.subscribe("late".into(), 7).await;
        assert!(late.try_recv().is_err());
    }
}
