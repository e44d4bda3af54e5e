//! Dashboard read endpoints (JWT authenticated, scoped to the caller).
//!
//! - GET /overview
//! - GET /logs?limit&offset&since
//! - GET /monitoring
//! - GET /chart-data?range=1d|7d|30d|90d
//! - GET /predictions?limit&page

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    error::AppError,
    middleware::jwt::AuthUser,
    models::dashboard::{
        ChartQuery, ChartResponse, LogsQuery, LogsResponse, MonitoringResponse, OverviewResponse,
        PredictionsQuery, PredictionsResponse,
    },
    services::analytics_service::{self, ChartRange},
    state::AppState,
};

pub async fn overview(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<OverviewResponse>, AppError> {
    Ok(Json(analytics_service::overview(&state.pool, user.user_id).await?))
}

pub async fn logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, AppError> {
    Ok(Json(analytics_service::logs(&state.pool, user.user_id, query).await?))
}

pub async fn monitoring(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MonitoringResponse>, AppError> {
    Ok(Json(analytics_service::monitoring(&state.pool, user.user_id).await?))
}

/// Unknown ranges fall back to `7d`.
pub async fn chart_data(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, AppError> {
    let range = ChartRange::parse(query.range.as_deref());
    Ok(Json(
        analytics_service::chart_data(&state.pool, user.user_id, range).await?,
    ))
}

pub async fn predictions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PredictionsQuery>,
) -> Result<Json<PredictionsResponse>, AppError> {
    Ok(Json(
        analytics_service::predictions(&state.pool, user.user_id, query).await?,
    ))
}
