//! Ingestion endpoint.
//!
//! - POST /api/predict - classify a payload and record the prediction

use axum::{
    Extension, Json,
    extract::{OriginalUri, State},
};
use serde_json::Value;

use crate::{
    error::AppError,
    middleware::api_key::ApiKeyContext,
    models::prediction::PredictResponse,
    services::prediction_service::InboundRequest,
    state::AppState,
};

/// Classify one payload.
///
/// # Authentication
///
/// Requires a valid, active, unexpired API key. The prediction is attributed
/// to the key's owner; nothing in the body or headers can change that.
///
/// # Request Body
///
/// Any JSON object; it is forwarded to the model unchanged.
///
/// # Response
///
/// - **200**: `{success, event_id, prediction_id, prediction, label, confidence,
///   attack_detected, risk_score}`
/// - **401**: missing / invalid / expired key
/// - **422**: the model rejected the payload shape
/// - **502 / 503**: the model answered nonsense or is unavailable
/// - **500**: persistence or attribution failure
///
/// The pipeline runs on its own task: if the caller disconnects, the unit of
/// work still commits or rolls back cleanly.
pub async fn predict(
    State(state): State<AppState>,
    Extension(auth): Extension<ApiKeyContext>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<Value>,
) -> Result<Json<PredictResponse>, AppError> {
    if !payload.is_object() {
        return Err(AppError::InvalidRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    let inbound = InboundRequest {
        payload,
        source_ip: auth.source_ip.clone(),
        endpoint: Some(uri.path().to_string()),
    };

    let writer = state.writer.clone();
    let event = tokio::spawn(async move {
        writer
            .create_prediction_event(auth.user_id, auth.api_key_id, inbound)
            .await
    })
    .await
    .map_err(|e| AppError::Internal(format!("prediction task failed: {e}")))??;

    Ok(Json(event.into()))
}
