//! Prediction data models and ingestion request/response types.
//!
//! This module defines:
//! - `PredictionLabel`: the binary classification outcome
//! - `ClientEvent`: the raw inbound request record
//! - `PredictionEvent`: the canonical, append-only classification record
//! - `PredictResponse`: response body of `POST /api/predict`
//! - `PredictionSummary`: the payload pushed to real-time subscribers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::DbId;

/// Outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionLabel {
    Attack,
    Safe,
}

impl PredictionLabel {
    /// Value stored in `prediction_events.prediction_label`.
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionLabel::Attack => "attack",
            PredictionLabel::Safe => "safe",
        }
    }

    pub fn is_attack(self) -> bool {
        self == PredictionLabel::Attack
    }
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown prediction label: {0}")]
pub struct UnknownLabel(String);

impl FromStr for PredictionLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attack" => Ok(PredictionLabel::Attack),
            "safe" => Ok(PredictionLabel::Safe),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

impl TryFrom<String> for PredictionLabel {
    type Error = UnknownLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Raw record of one inbound ingestion request.
///
/// # Database Table
///
/// Maps to `client_events`. Written inside the same transaction as the
/// prediction it leads to, so it never outlives a failed pipeline run.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClientEvent {
    pub id: DbId,
    pub user_id: DbId,
    pub api_key_id: DbId,
    pub payload: serde_json::Value,
    pub source_ip: Option<String>,
    pub endpoint: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Durable record of one classification outcome.
///
/// # Database Table
///
/// Maps to `prediction_events`. Rows are append-only: a trigger rejects
/// every UPDATE, and rows disappear only when their owning user is deleted.
///
/// `user_id` always equals the owner of `api_key_id` at insert time.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PredictionEvent {
    pub id: DbId,
    pub user_id: DbId,
    pub api_key_id: DbId,
    pub client_event_id: Option<DbId>,
    pub request_payload: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub prediction_label: PredictionLabel,
    pub confidence_score: f64,
    pub risk_score: Option<f64>,
    pub response_payload: serde_json::Value,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

/// Response returned by `POST /api/predict`.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": true,
///   "event_id": 41,
///   "prediction_id": 87,
///   "prediction": {"prediction": 1, "confidence": 0.93},
///   "label": "attack",
///   "confidence": 0.93,
///   "attack_detected": true,
///   "risk_score": 0.8
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub event_id: Option<DbId>,
    pub prediction_id: DbId,
    /// The raw model response.
    pub prediction: serde_json::Value,
    pub label: PredictionLabel,
    pub confidence: f64,
    pub attack_detected: bool,
    pub risk_score: Option<f64>,
}

impl From<PredictionEvent> for PredictResponse {
    fn from(event: PredictionEvent) -> Self {
        Self {
            success: true,
            event_id: event.client_event_id,
            prediction_id: event.id,
            prediction: event.response_payload,
            label: event.prediction_label,
            confidence: event.confidence_score,
            attack_detected: event.prediction_label.is_attack(),
            risk_score: event.risk_score,
        }
    }
}

/// Summary pushed to a user's real-time channel after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub id: DbId,
    pub event_id: Option<DbId>,
    pub label: PredictionLabel,
    pub confidence: f64,
    pub risk_score: Option<f64>,
    pub attack_detected: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&PredictionEvent> for PredictionSummary {
    fn from(event: &PredictionEvent) -> Self {
        Self {
            id: event.id,
            event_id: event.client_event_id,
            label: event.prediction_label,
            confidence: event.confidence_score,
            risk_score: event.risk_score,
            attack_detected: event.prediction_label.is_attack(),
            created_at: event.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_storage_form() {
        for label in [PredictionLabel::Attack, PredictionLabel::Safe] {
            assert_eq!(label.as_str().parse::<PredictionLabel>().unwrap(), label);
        }
        assert!("malicious".parse::<PredictionLabel>().is_err());
    }

    #[test]
    fn label_serializes_lowercase() {
        let json = serde_json::to_string(&PredictionLabel::Attack).unwrap();
        assert_eq!(json, "\"attack\"");
    }
}
