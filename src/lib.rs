//! Threat prediction service.
//!
//! Accepts classification requests from client integrations (API key
//! authenticated), forwards them to an external inference service, stores
//! each outcome as an append-only prediction event attributed to the key's
//! owner, and pushes committed predictions to that owner's dashboard
//! connections. Dashboard read endpoints (JWT authenticated) serve stats,
//! logs and charts scoped to the caller.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod ws;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Dashboard read routes; mounted under both `/api/analytics` and `/api/dashboard`.
fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(handlers::dashboard::overview))
        .route("/logs", get(handlers::dashboard::logs))
        .route("/monitoring", get(handlers::dashboard::monitoring))
        .route("/chart-data", get(handlers::dashboard::chart_data))
        .route("/predictions", get(handlers::dashboard::predictions))
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    // Ingestion: API key authenticated
    let ingestion_routes = Router::new()
        .route("/api/predict", post(handlers::predict::predict))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::api_key::api_key_middleware,
        ));

    // Key management: JWT authenticated through the AuthUser extractor
    let api_key_routes = Router::new()
        .route(
            "/api/apikeys",
            get(handlers::api_keys::list_keys).post(handlers::api_keys::create_key),
        )
        .route(
            "/api/apikeys/{id}/regenerate",
            put(handlers::api_keys::regenerate_key),
        )
        .route(
            "/api/apikeys/{id}",
            axum::routing::patch(handlers::api_keys::update_key)
                .delete(handlers::api_keys::delete_key),
        );

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/ws", get(ws::ws_handler))
        .merge(ingestion_routes)
        .merge(api_key_routes)
        .nest("/api/analytics", dashboard_routes())
        .nest("/api/dashboard", dashboard_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
