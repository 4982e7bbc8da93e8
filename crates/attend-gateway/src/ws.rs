// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket fan-out of attendance events.
//!
//! Clients connect to `/ws?token=..&tenant_id=..&user_id=..` and receive
//! every event of their tenant as JSON text frames:
//!
//! ```json
//! {"type": "connected", "connection_id": "..."}
//! {"type": "attendance.claimed", "tenant_id": "t1", "actor_user_id": "u1", "attendance": {...}, "occurred_at": "..."}
//! ```
//!
//! Delivery is at-most-once. A client that reconnects or falls behind
//! refreshes its view through the REST API.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Handshake parameters.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
    tenant_id: String,
    user_id: String,
}

/// A connected client, kept in [`GatewayState::ws_clients`].
#[derive(Debug, Clone, Serialize)]
pub struct WsClient {
    pub tenant_id: String,
    pub user_id: String,
    pub connected_at: String,
}

/// First frame sent on every connection.
#[derive(Debug, Serialize)]
struct Connected<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    connection_id: &'a str,
}

/// WebSocket upgrade handler. Authenticates during the handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(params): Query<WsParams>,
) -> Response {
    if !state.auth.accepts(params.token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if params.tenant_id.trim().is_empty() || params.user_id.trim().is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Handle an individual WebSocket connection.
///
/// A forwarder task pushes tenant events to the client while this task
/// reads client frames until close or server shutdown.
async fn handle_socket(socket: WebSocket, state: GatewayState, params: WsParams) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let hello = Connected {
        kind: message_types::CONNECTED,
        connection_id: &connection_id,
    };
    let Ok(hello) = serde_json::to_string(&hello) else {
        return;
    };
    if ws_sender.send(Message::Text(hello.into())).await.is_err() {
        return;
    }

    let mut subscription = state.bus.subscribe_tenant(params.tenant_id.clone());
    state.ws_clients.insert(
        connection_id.clone(),
        WsClient {
            tenant_id: params.tenant_id.clone(),
            user_id: params.user_id.clone(),
            connected_at: chrono::Utc::now().to_rfc3339(),
        },
    );
    tracing::info!(
        connection_id = %connection_id,
        tenant_id = %params.tenant_id,
        user_id = %params.user_id,
        "websocket client connected"
    );

    let shutdown = state.shutdown.clone();
    let mut sender_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = subscription.recv() => event,
                () = shutdown.cancelled() => None,
            };
            let Some(event) = event else {
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            };
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("failed to serialize event: {e}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(connection_id = %connection_id, len = text.len(), "ignoring client text frame");
                }
                // Binary is ignored; ping/pong are answered by the protocol layer.
                Some(Ok(_)) => {}
            },
            _ = &mut sender_task => break,
        }
    }

    state.ws_clients.remove(&connection_id);
    sender_task.abort();
    tracing::info!(connection_id = %connection_id, "websocket client disconnected");
}

/// WebSocket message type constants for server -> client messages.
///
/// Event frames carry the event type (`attendance.new`, ...) instead.
pub mod message_types {
    /// Sent once after the handshake.
    pub const CONNECTED: &str = "connected";
}
