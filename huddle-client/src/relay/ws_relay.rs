use crate::relay::{RelayConnector, RelayError, RelayLink, RelaySender};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::{PeerId, RoomId, SignalingEnvelope};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

/// Connects to a huddle relay over WebSocket.
///
/// `base_url` is the relay root, e.g. `ws://localhost:3000`; the room and
/// peer are appended as `/rooms/{room_id}/peers/{peer_id}`.
#[derive(Debug, Clone)]
pub struct WsRelayConnector {
    base_url: Url,
}

impl WsRelayConnector {
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        let base_url = Url::parse(base_url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        match base_url.scheme() {
            "ws" | "wss" => Ok(Self { base_url }),
            other => Err(RelayError::InvalidUrl(format!(
                "unsupported scheme '{other}', expected ws or wss"
            ))),
        }
    }

    pub fn endpoint(&self, room_id: &RoomId, peer_id: &PeerId) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["rooms", room_id.as_str(), "peers", peer_id.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl RelayConnector for WsRelayConnector {
    async fn connect(&self, room_id: &RoomId, peer_id: &PeerId) -> Result<RelayLink, RelayError> {
        let url = self.endpoint(room_id, peer_id)?;
        info!("Connecting to relay at {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<SignalingEnvelope>();

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if write.send(msg).await.is_err() || closing {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match SignalingEnvelope::decode(&text) {
                        Ok(envelope) => {
                            if inbound_tx.send(envelope).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid envelope from relay: {}", e),
                    },
                    Ok(Message::Close(frame)) => {
                        debug!("Relay closed the connection: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(RelayLink {
            sender: Box::new(WsRelaySender {
                outbound: outbound_tx,
                reader,
            }),
            inbound: inbound_rx,
        })
    }
}

/// The writer task drains queued frames and exits once `outbound` is dropped.
struct WsRelaySender {
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl RelaySender for WsRelaySender {
    async fn send(&self, envelope: SignalingEnvelope) -> Result<(), RelayError> {
        let json = envelope.encode()?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| RelayError::Closed)
    }

    async fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
        self.reader.abort();
    }
}

impl Drop for WsRelaySender {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
