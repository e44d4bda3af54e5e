use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::db::DbId;
use crate::error::AppError;
use crate::middleware::jwt::validate_token;
use crate::state::AppState;
use crate::ws::registry::ChannelRegistry;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Dashboard JWT. Browsers cannot set headers on a websocket upgrade.
    pub token: String,
}

/// Upgrade to a websocket subscribed to the caller's private channel.
///
/// The channel is chosen from the verified token subject only; nothing the
/// client sends after the upgrade can change it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let claims = validate_token(&params.token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token"))?;

    let channels = state.channels.clone();
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, channels, claims.sub))
        .into_response())
}

/// Drive one subscribed connection until either side closes it.
async fn handle_socket(socket: WebSocket, channels: Arc<ChannelRegistry>, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "Dashboard subscriber connected");

    let mut rx = channels.subscribe(conn_id.clone(), user_id).await;
    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || closing {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Inbound frames carry nothing we act on; read until the client leaves.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    channels.unsubscribe(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id, "Dashboard subscriber disconnected");
}
