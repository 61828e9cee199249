//! WebSocket push channel for health updates.
//!
//! Clients join the `health` topic with `{"action":"join","room":"health"}`
//! and receive `{"event":"health-update","room":"health","data":{...}}` after
//! every completed sampler tick. `{"action":"leave","room":"health"}` stops
//! the updates without closing the socket.

use crate::metrics::{HealthReport, MetricsStore};
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The only topic clients can join.
pub const HEALTH_ROOM: &str = "health";

/// Event name of a pushed health record.
pub const HEALTH_UPDATE_EVENT: &str = "health-update";

/// Messages accepted from clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientCommand {
    Join { room: String },
    Leave { room: String },
}

/// Messages sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    #[serde(rename = "health-update")]
    HealthUpdate {
        room: &'static str,
        data: HealthReport,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    fn health_update(report: HealthReport) -> Self {
        Self::HealthUpdate {
            room: HEALTH_ROOM,
            data: report,
        }
    }

    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json)),
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Client {
    connected_at: DateTime<Utc>,
    joined_health: bool,
}

/// Registry of connected WebSocket clients.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<Uuid, Client>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connected clients.
    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of clients currently in the health topic.
    pub async fn health_members(&self) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|client| client.joined_health)
            .count()
    }

    /// Connection details for the status endpoint.
    pub async fn describe(&self) -> Vec<serde_json::Value> {
        let now = Utc::now();
        self.clients
            .read()
            .await
            .iter()
            .map(|(id, client)| {
                serde_json::json!({
                    "id": id.to_string(),
                    "connected_at": client.connected_at.to_rfc3339(),
                    "connected_duration_seconds": (now - client.connected_at).num_seconds(),
                    "joined": client.joined_health,
                })
            })
            .collect()
    }

    /// Register a new client unless `limit` clients are already connected.
    /// The check and the insert happen under one write lock.
    async fn try_reserve(&self, limit: usize) -> Option<Uuid> {
        let mut clients = self.clients.write().await;
        if clients.len() >= limit {
            return None;
        }

        let id = Uuid::new_v4();
        clients.insert(
            id,
            Client {
                connected_at: Utc::now(),
                joined_health: false,
            },
        );
        Some(id)
    }

    async fn set_joined(&self, id: Uuid, joined: bool) {
        if let Some(client) = self.clients.write().await.get_mut(&id) {
            client.joined_health = joined;
        }
    }

    async fn remove(&self, id: Uuid) {
        self.clients.write().await.remove(&id);
    }
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(client_id) = state
        .clients
        .try_reserve(state.max_websocket_connections)
        .await
    else {
        warn!(
            "Rejecting WebSocket client: all {} connections in use",
            state.max_websocket_connections
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many WebSocket connections").into_response();
    };

    let clients = state.clients.clone();
    ws.on_failed_upgrade(move |e| {
        warn!("WebSocket upgrade failed for client {}: {}", client_id, e);
        tokio::spawn(async move { clients.remove(client_id).await });
    })
    .on_upgrade(move |socket| handle_websocket(socket, client_id, state))
}

/// Handle a WebSocket connection whose slot is already reserved.
async fn handle_websocket(socket: WebSocket, client_id: Uuid, state: AppState) {
    info!("WebSocket client connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut updates: Option<BroadcastStream<HealthReport>> = None;

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    debug!("Received message from {}: {}", client_id, text);
                    let keep_open = handle_command(
                        &text,
                        client_id,
                        &state,
                        &mut updates,
                        &mut sender,
                    )
                    .await;
                    if !keep_open {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error for client {}: {}", client_id, e);
                    break;
                }
            },
            Some(report) = next_update(&mut updates) => {
                if !send_event(&mut sender, &ServerEvent::health_update(report)).await {
                    break;
                }
            }
        }
    }

    state.clients.remove(client_id).await;
    info!("WebSocket client disconnected: {}", client_id);
}

/// Apply one client command. Returns `false` when the socket should close.
async fn handle_command(
    text: &str,
    client_id: Uuid,
    state: &AppState,
    updates: &mut Option<BroadcastStream<HealthReport>>,
    sender: &mut SplitSink<WebSocket, Message>,
) -> bool {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            let event = ServerEvent::Error {
                message: format!("invalid command: {}", e),
            };
            return send_event(sender, &event).await;
        }
    };

    match command {
        ClientCommand::Join { room } if room == HEALTH_ROOM => {
            if updates.is_none() {
                *updates = Some(join_health(&state.store));
                state.clients.set_joined(client_id, true).await;
                info!("Client {} joined room {}", client_id, HEALTH_ROOM);
            }
            // Members see the current record without waiting for the next tick
            let current = state.store.report().await;
            send_event(sender, &ServerEvent::health_update(current)).await
        }
        ClientCommand::Leave { room } if room == HEALTH_ROOM => {
            if updates.take().is_some() {
                state.clients.set_joined(client_id, false).await;
                info!("Client {} left room {}", client_id, HEALTH_ROOM);
            }
            true
        }
        ClientCommand::Join { room } | ClientCommand::Leave { room } => {
            let event = ServerEvent::Error {
                message: format!("unknown room: {}", room),
            };
            send_event(sender, &event).await
        }
    }
}

fn join_health(store: &MetricsStore) -> BroadcastStream<HealthReport> {
    BroadcastStream::new(store.subscribe())
}

/// Next pushed report, or never when the client is not a member.
async fn next_update(updates: &mut Option<BroadcastStream<HealthReport>>) -> Option<HealthReport> {
    let Some(stream) = updates.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        let item = stream.next().await;
        match item {
            Some(Ok(report)) => return Some(report),
            Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                debug!("Slow WebSocket client skipped {} health updates", skipped);
            }
            None => {
                *updates = None;
                return None;
            }
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> bool {
    let Some(message) = event.to_message() else {
        return true;
    };
    match sender.send(message).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to send WebSocket message: {}", e);
            false
        }
    }
}
