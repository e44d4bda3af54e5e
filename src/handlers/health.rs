//! Liveness check: database reachability plus live dashboard connections.

use crate::{error::AppError, state::AppState};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    /// Live dashboard websocket connections.
    pub subscribers: usize,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "subscribers": 2,
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// A failing `SELECT 1` surfaces as the usual 500 error body.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        database: "connected".to_string(),
        subscribers: state.channels.connection_count().await,
        timestamp: Utc::now(),
    }))
}
