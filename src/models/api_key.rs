//! API Key model for ingestion authentication.
//!
//! API keys authenticate client integrations calling `POST /api/predict`.
//! They are stored in the database as SHA-256 hashes; the plaintext secret is
//! shown to its owner exactly once, when it is created or regenerated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::db::DbId;

/// Number of leading secret characters kept for display.
pub const KEY_PREFIX_LEN: usize = 8;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. `user_id` is fixed at creation; a trigger
/// rejects any update that would move a key to another user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: DbId,

    /// Owner of the key. The only source of tenant attribution for ingestion.
    pub user_id: DbId,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    /// First characters of the secret, used for masked display.
    pub key_prefix: String,

    pub label: Option<String>,

    /// Inactive keys are rejected during authentication.
    pub is_active: bool,

    pub expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Whether the key may authenticate a request at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// Hash a plaintext API key the way it is stored.
pub fn hash_api_key(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new secret: 32 random bytes, hex encoded (64 characters).
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Request body for `POST /api/apikeys`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateApiKeyRequest {
    pub label: Option<String>,

    /// Optional lifetime; the key never expires when omitted.
    pub expires_in_days: Option<i64>,
}

/// Request body for `PATCH /api/apikeys/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub is_active: bool,
}

/// API key as listed to its owner. The secret is masked.
///
/// ```json
/// {
///   "id": 3,
///   "key": "a1b2c3d4****",
///   "key_masked": true,
///   "label": "production",
///   "is_active": true,
///   "expires_at": null,
///   "created_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub id: DbId,
    pub key: String,
    pub key_masked: bool,
    pub label: Option<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            key: format!("{}****", key.key_prefix),
            key_masked: true,
            label: key.label,
            is_active: key.is_active,
            expires_at: key.expires_at,
            created_at: key.created_at,
        }
    }
}

impl ApiKeyResponse {
    /// Replace the mask with the plaintext secret (create/regenerate only).
    pub fn with_secret(mut self, secret: String) -> Self {
        self.key = secret;
        self.key_masked = false;
        self
    }
}
