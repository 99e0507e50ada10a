mod ws_relay;

pub use ws_relay::WsRelayConnector;

use async_trait::async_trait;
use huddle_core::{PeerId, ProtocolError, RoomId, SignalingEnvelope};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
    #[error("failed to connect to relay: {0}")]
    Connect(String),
    #[error("relay connection closed")]
    Closed,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Outbound half of a relay registration.
#[async_trait]
pub trait RelaySender: Send + Sync {
    async fn send(&self, envelope: SignalingEnvelope) -> Result<(), RelayError>;

    /// Unregister from the room. Envelopes sent afterwards are lost.
    async fn close(&self);
}

/// A live registration: envelopes for this peer arrive on `inbound`, which
/// ends when the relay connection is lost.
pub struct RelayLink {
    pub sender: Box<dyn RelaySender>,
    pub inbound: mpsc::UnboundedReceiver<SignalingEnvelope>,
}

#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn connect(&self, room_id: &RoomId, peer_id: &PeerId) -> Result<RelayLink, RelayError>;
}
