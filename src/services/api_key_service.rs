//! API key lifecycle: authentication lookup, create, list, regenerate,
//! activate/deactivate and delete.
//!
//! Every management query filters by the authenticated `user_id`, and none of
//! them writes `user_id` after the insert: a key's owner never changes.

use chrono::{Duration, Utc};

use crate::db::{DbId, DbPool};
use crate::error::AppError;
use crate::models::api_key::{
    ApiKey, ApiKeyResponse, CreateApiKeyRequest, KEY_PREFIX_LEN, generate_api_key, hash_api_key,
};

const API_KEY_COLUMNS: &str =
    "id, user_id, key_hash, key_prefix, label, is_active, expires_at, created_at";

/// Resolve a plaintext secret to a usable key.
///
/// # Errors
///
/// - `Unauthorized` when the key is unknown, deactivated, or expired
pub async fn authenticate(pool: &DbPool, secret: &str) -> Result<ApiKey, AppError> {
    let key = sqlx::query_as::<_, ApiKey>(&format!(
        "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = $1"
    ))
    .bind(hash_api_key(secret))
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized("Invalid API key"))?;

    if !key.is_active {
        return Err(AppError::Unauthorized("API key is deactivated"));
    }

    if !key.is_usable_at(Utc::now()) {
        return Err(AppError::Unauthorized("API key has expired"));
    }

    Ok(key)
}

/// List the caller's keys, newest first, secrets masked.
pub async fn list_keys(pool: &DbPool, user_id: DbId) -> Result<Vec<ApiKeyResponse>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>(&format!(
        r#"
        SELECT {API_KEY_COLUMNS}
        FROM api_keys
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().map(Into::into).collect())
}

/// Create a key for `user_id`. The response carries the plaintext secret,
/// which is not recoverable afterwards.
pub async fn create_key(
    pool: &DbPool,
    user_id: DbId,
    request: CreateApiKeyRequest,
) -> Result<ApiKeyResponse, AppError> {
    let expires_at = match request.expires_in_days {
        Some(days) if days <= 0 => {
            return Err(AppError::InvalidRequest(
                "expires_in_days must be positive".to_string(),
            ));
        }
        Some(days) => Some(Utc::now() + Duration::days(days)),
        None => None,
    };

    let secret = generate_api_key();

    let key = sqlx::query_as::<_, ApiKey>(&format!(
        r#"
        INSERT INTO api_keys (user_id, key_hash, key_prefix, label, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {API_KEY_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(hash_api_key(&secret))
    .bind(&secret[..KEY_PREFIX_LEN])
    .bind(request.label)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id, api_key_id = key.id, "API key created");

    Ok(ApiKeyResponse::from(key).with_secret(secret))
}

/// Replace a key's secret, keeping its id, owner, label and flags.
pub async fn regenerate_key(
    pool: &DbPool,
    user_id: DbId,
    key_id: DbId,
) -> Result<ApiKeyResponse, AppError> {
    let secret = generate_api_key();

    let key = sqlx::query_as::<_, ApiKey>(&format!(
        r#"
        UPDATE api_keys
        SET key_hash = $1, key_prefix = $2
        WHERE id = $3 AND user_id = $4
        RETURNING {API_KEY_COLUMNS}
        "#
    ))
    .bind(hash_api_key(&secret))
    .bind(&secret[..KEY_PREFIX_LEN])
    .bind(key_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ApiKeyNotFound)?;

    tracing::info!(user_id, api_key_id = key.id, "API key regenerated");

    Ok(ApiKeyResponse::from(key).with_secret(secret))
}

/// Activate or deactivate a key.
pub async fn set_active(
    pool: &DbPool,
    user_id: DbId,
    key_id: DbId,
    is_active: bool,
) -> Result<ApiKeyResponse, AppError> {
    let key = sqlx::query_as::<_, ApiKey>(&format!(
        r#"
        UPDATE api_keys
        SET is_active = $1
        WHERE id = $2 AND user_id = $3
        RETURNING {API_KEY_COLUMNS}
        "#
    ))
    .bind(is_active)
    .bind(key_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ApiKeyNotFound)?;

    Ok(key.into())
}

/// Delete a key. Prediction history referencing it is kept.
pub async fn delete_key(pool: &DbPool, user_id: DbId, key_id: DbId) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
        .bind(key_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ApiKeyNotFound);
    }

    tracing::info!(user_id, api_key_id = key_id, "API key deleted");
    Ok(())
}
