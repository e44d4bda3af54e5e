//! Dashboard read models: query parameters, row types and response bodies.
//!
//! Every row type here is produced by a query filtered on `user_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::DbId;
use crate::models::prediction::PredictionLabel;

/// One prediction as shown on the overview and predictions pages.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PredictionRow {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub prediction_label: PredictionLabel,
    pub confidence_score: f64,
    pub risk_score: Option<f64>,
    pub response_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub api_key_label: Option<String>,
    pub client_event_payload: Option<serde_json::Value>,
}

/// `GET /overview` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OverviewResponse {
    pub total_predictions: i64,
    pub total_attacks: i64,
    pub avg_confidence: f64,
    pub latest_prediction: Option<PredictionRow>,
    pub recent_predictions: Vec<PredictionRow>,
}

/// Query string of `GET /logs`.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Only entries created at or after this instant (RFC 3339).
    pub since: Option<DateTime<Utc>>,
}

/// One log line, named the way the dashboard log table expects.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LogRow {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub status: PredictionLabel,
    pub probability: f64,
    pub risk_score: Option<f64>,
    pub prediction: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub api_key: Option<String>,
}

/// `GET /logs` response. `total` is the number of rows in this page.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogRow>,
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub prediction_label: PredictionLabel,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonitoringMetrics {
    pub attacks_24h: i64,
    pub safe_24h: i64,
    /// Percentage, rounded to two decimals.
    pub attack_rate: f64,
    pub avg_confidence: f64,
}

/// `GET /monitoring` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitoringResponse {
    /// `"warning"` or `"healthy"`.
    pub status: String,
    pub metrics: MonitoringMetrics,
    pub hourly_distribution: Vec<HourlyBucket>,
}

/// Query string of `GET /chart-data`.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub range: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChartBucketRow {
    pub time_bucket: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub prediction_label: PredictionLabel,
    pub count: i64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: DateTime<Utc>,
    pub count: i64,
    pub confidence: f64,
}

/// `GET /chart-data` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChartResponse {
    pub range: String,
    /// `"hour"` or `"day"`.
    pub bucket: String,
    pub attacks_over_time: Vec<ChartPoint>,
    pub safe_over_time: Vec<ChartPoint>,
}

/// Query string of `GET /predictions`.
#[derive(Debug, Default, Deserialize)]
pub struct PredictionsQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

/// `GET /predictions` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionRow>,
    pub pagination: Pagination,
}
