mod rtc_connector;
mod transport_event;

pub use rtc_connector::RtcConnector;
pub use transport_event::{LinkId, TransportEvent, TransportEvents};

use crate::media::LocalStream;
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, PeerId, SessionDescription};
use std::sync::Arc;

/// One peer connection object, owned by a single peer link.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create an answer and install it as the local description.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds transports with the local tracks attached.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        remote_peer_id: &PeerId,
        local_stream: &LocalStream,
        events: TransportEvents,
    ) -> Result<Arc<dyn PeerTransport>>;
}
