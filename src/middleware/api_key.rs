//! API key authentication middleware for the ingestion endpoint.
//!
//! This middleware intercepts every ingestion request to:
//! 1. Extract the API key from `X-API-Key` (or `Authorization: Bearer <key>`)
//! 2. Hash it and look the key up
//! 3. Reject unknown, inactive or expired keys with HTTP 401
//! 4. Inject [`ApiKeyContext`] built from the stored row

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{db::DbId, error::AppError, services::api_key_service, state::AppState};

/// Authentication context attached to ingestion requests.
///
/// `user_id` comes from the `api_keys` row, never from request input.
#[derive(Debug, Clone)]
pub struct ApiKeyContext {
    pub api_key_id: DbId,
    pub user_id: DbId,
    /// Best-effort caller address, recorded on the inbound event.
    pub source_ip: Option<String>,
}

pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = extract_api_key(request.headers())
        .ok_or(AppError::Unauthorized("API key required"))?;

    let api_key = api_key_service::authenticate(&state.pool, &secret).await?;

    let source_ip = client_ip(&request);

    tracing::debug!(
        api_key_id = api_key.id,
        user_id = api_key.user_id,
        key_prefix = %api_key.key_prefix,
        "API key validated"
    );

    request.extensions_mut().insert(ApiKeyContext {
        api_key_id: api_key.id,
        user_id: api_key.user_id,
        source_ip,
    });

    Ok(next.run(request).await)
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let from_bearer = || {
        headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|k| !k.is_empty())
    };

    from_header.or_else(from_bearer).map(str::to_owned)
}

/// First `X-Forwarded-For` hop, only when it parses as an IP address.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .and_then(|ip| ip.trim().parse::<IpAddr>().ok())
}

fn client_ip(request: &Request) -> Option<String> {
    forwarded_ip(request.headers())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
}
