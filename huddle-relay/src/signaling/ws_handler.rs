use crate::room::RelayHub;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::{PeerId, RoomId, SignalingEnvelope};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info, warn};

const MIN_HEARTBEAT: Duration = Duration::from_millis(100);

/// Shared state handed to every WebSocket connection.
#[derive(Clone)]
pub struct RelayState {
    pub hub: RelayHub,
    pub heartbeat_interval: Duration,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, peer_id)): Path<(String, String)>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    let room_id = RoomId::from(room_id);
    let peer_id = PeerId::from(peer_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, peer_id, state))
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, peer_id: PeerId, state: RelayState) {
    info!("New WebSocket connection: {} in room '{}'", peer_id, room_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SignalingEnvelope>();

    let registration = state.hub.register(room_id, peer_id, tx);
    let heartbeat = state.heartbeat_interval.max(MIN_HEARTBEAT);

    let mut send_task = tokio::spawn(async move {
        let mut ping = time::interval(heartbeat);
        ping.tick().await;

        loop {
            tokio::select! {
                queued = rx.recv() => {
                    // Queue closes when the hub drops this member.
                    let Some(envelope) = queued else { break };
                    match envelope.encode() {
                        Ok(json) => {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("Failed to serialize envelope: {}", e),
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn({
        let hub = state.hub.clone();
        let registration = registration.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match SignalingEnvelope::decode(&text) {
                        Ok(envelope) => hub.route(&registration, envelope),
                        Err(e) => warn!(
                            "Invalid envelope from {}: {}",
                            registration.peer_id, e
                        ),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.hub.unregister(&registration);
    info!(
        "WebSocket disconnected: {} from room '{}'",
        registration.peer_id, registration.room_id
    );
}
