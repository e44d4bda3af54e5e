use std::sync::Arc;

use crate::config::Config;
use crate::db::DbPool;
use crate::services::prediction_service::PredictionWriter;
use crate::ws::ChannelRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    /// Live dashboard connections, grouped by user channel.
    pub channels: Arc<ChannelRegistry>,
    pub writer: PredictionWriter,
}
