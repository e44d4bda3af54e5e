//! HTTP handlers for API key management.
//!
//! All routes require a dashboard JWT and only ever touch the caller's keys.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    db::DbId,
    error::AppError,
    middleware::jwt::AuthUser,
    models::api_key::{ApiKeyResponse, CreateApiKeyRequest, UpdateApiKeyRequest},
    services::api_key_service,
    state::AppState,
};

/// `GET /api/apikeys` - secrets are masked.
pub async fn list_keys(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    Ok(Json(api_key_service::list_keys(&state.pool, user.user_id).await?))
}

/// `POST /api/apikeys` - returns 201 with the plaintext secret, shown once.
pub async fn create_key(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<CreateApiKeyRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let key = api_key_service::create_key(&state.pool, user.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(key)))
}

/// `PUT /api/apikeys/{id}/regenerate` - new secret, same identity and owner.
pub async fn regenerate_key(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key_id): Path<DbId>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    Ok(Json(
        api_key_service::regenerate_key(&state.pool, user.user_id, key_id).await?,
    ))
}

/// `PATCH /api/apikeys/{id}` - activate or deactivate.
pub async fn update_key(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key_id): Path<DbId>,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<ApiKeyResponse>, AppError> {
    Ok(Json(
        api_key_service::set_active(&state.pool, user.user_id, key_id, request.is_active).await?,
    ))
}

/// `DELETE /api/apikeys/{id}` - 204 on success, 404 if not the caller's key.
pub async fn delete_key(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key_id): Path<DbId>,
) -> Result<StatusCode, AppError> {
    api_key_service::delete_key(&state.pool, user.user_id, key_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
