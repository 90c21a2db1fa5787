//! WebSocket layer: live event feeds for dashboards and per-emergency
//! participants.
//!
//! `GET /ws/feed` streams the global topic (new-emergency announcements);
//! `GET /ws/emergency/:id` streams one emergency's scope. Subscriptions
//! are transient: they start at the moment of connection (no replay) and
//! end when the socket or the scope closes. Inbound frames are ignored;
//! mutations go through the HTTP operations.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::api::types::ApiContext;
use crate::fanout::EmergencyEvent;

/// Keepalive interval for idle subscriptions.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// `GET /ws/feed` — subscribe to the global emergency feed.
pub async fn feed_upgrade(
    ws: WebSocketUpgrade,
    State(ctx): State<ApiContext>,
) -> impl IntoResponse {
    let rx = ctx.service.broker().subscribe_global();
    ws.on_upgrade(move |socket| stream_events(socket, rx, "global".to_string()))
}

/// `GET /ws/emergency/:id` — subscribe to one emergency's scope.
pub async fn scope_upgrade(
    ws: WebSocketUpgrade,
    State(ctx): State<ApiContext>,
    Path(emergency_id): Path<String>,
) -> impl IntoResponse {
    let rx = ctx.service.broker().subscribe(&emergency_id);
    ws.on_upgrade(move |socket| stream_events(socket, rx, emergency_id))
}

/// Forward broker events to the socket until either side ends.
async fn stream_events(
    socket: WebSocket,
    mut rx: broadcast::Receiver<EmergencyEvent>,
    scope: String,
) {
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // Consume initial immediate tick

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(_) => continue,
                    };
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(scope = %scope, skipped, "slow subscriber dropped events");
                }
                Err(RecvError::Closed) => {
                    // Scope closed (emergency reached a terminal status).
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                _ => {} // Read-only feed; inbound content ignored
            },
            _ = heartbeat.tick() => {
                let json = serde_json::json!({
                    "type": "heartbeat",
                    "server_time": chrono::Utc::now().to_rfc3339(),
                })
                .to_string();
                if sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!(scope = %scope, "websocket subscriber disconnected");
}
