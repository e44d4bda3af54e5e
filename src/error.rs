//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//! Internal detail (database errors, model response bodies, ownership audit
//! data) is logged here and never written into the response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::db::DbId;
use crate::services::model_client::ModelError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Authentication**: missing, invalid, expired or inactive credentials
/// - **Ownership**: an API key used on behalf of a user that does not own it
/// - **Model**: the inference service rejected the payload, is unreachable, or
///   answered with something that is not a prediction
/// - **Persistence**: any sqlx::Error; the surrounding transaction is rolled back
/// - **Request**: invalid parameters or unknown resources
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, constraint violation).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Credential is missing, invalid, inactive, or expired.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// The API key does not belong to the user the write would be attributed to.
    ///
    /// `actual_user_id` is kept for the audit log only.
    #[error("API key {api_key_id} does not belong to user {claimed_user_id}")]
    OwnershipViolation {
        api_key_id: DbId,
        claimed_user_id: DbId,
        actual_user_id: Option<DbId>,
    },

    /// The model service rejected the payload shape (HTTP 422 upstream).
    ///
    /// This is a caller-input problem: retrying the same payload will not help.
    #[error("Model rejected the payload: {0}")]
    ModelValidation(String),

    /// The model service could not be reached, timed out, or failed.
    #[error("Model service unavailable: {0}")]
    ModelUnavailable(String),

    /// The model service answered 2xx without a usable prediction.
    #[error("Model returned an unusable response: {0}")]
    ModelInvalidResponse(String),

    /// API key does not exist or does not belong to the authenticated user.
    #[error("API key not found")]
    ApiKeyNotFound,

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Unexpected internal failure (task panic, serialization).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(detail) => AppError::ModelValidation(detail),
            ModelError::Unreachable(detail) => AppError::ModelUnavailable(detail),
            ModelError::InvalidResponse(detail) => AppError::ModelInvalidResponse(detail),
        }
    }
}

impl AppError {
    /// Status code and stable machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::OwnershipViolation { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "prediction_failed")
            }
            AppError::ModelValidation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "model_validation_failed")
            }
            AppError::ModelUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
            AppError::ModelInvalidResponse(_) => {
                (StatusCode::BAD_GATEWAY, "model_invalid_response")
            }
            AppError::ApiKeyNotFound => (StatusCode::NOT_FOUND, "api_key_not_found"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    /// Message safe to show to an external caller.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized(reason) => (*reason).to_string(),
            AppError::OwnershipViolation { .. } => "Prediction failed".to_string(),
            AppError::ModelValidation(_) => {
                "The model rejected the payload; correct it before retrying".to_string()
            }
            AppError::ModelUnavailable(_) => "Model service is unavailable".to_string(),
            AppError::ModelInvalidResponse(_) => {
                "Model service returned an unusable response".to_string()
            }
            AppError::ApiKeyNotFound => self.to_string(),
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::Database(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::OwnershipViolation {
                api_key_id,
                claimed_user_id,
                actual_user_id,
            } => {
                tracing::error!(
                    api_key_id,
                    claimed_user_id,
                    actual_user_id = ?actual_user_id,
                    "SECURITY: ownership violation on prediction write"
                );
            }
            AppError::Database(e) => tracing::error!(error = %e, "database error"),
            AppError::Internal(e) => tracing::error!(error = %e, "internal error"),
            AppError::ModelUnavailable(e) | AppError::ModelInvalidResponse(e) => {
                tracing::warn!(error = %e, "model service failure")
            }
            AppError::ModelValidation(e) => tracing::info!(detail = %e, "model rejected payload"),
            _ => {}
        }

        let (status, code) = self.status_and_code();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.public_message()
            }
        }));

        (status, body).into_response()
    }
}
