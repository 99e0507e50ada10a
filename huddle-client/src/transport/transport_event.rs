use crate::media::RemoteStream;
use huddle_core::{IceCandidate, PeerId};
use std::fmt;
use tokio::sync::mpsc;

/// Identifies one peer link instance. A peer that rejoins gets a new link id,
/// so events from the replaced transport can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub(crate) u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Things a transport reports back to its session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A local ICE candidate to trickle to the remote peer.
    CandidateGenerated(PeerId, LinkId, IceCandidate),
    /// Media started flowing from the remote peer.
    Connected(PeerId, LinkId, RemoteStream),
    Failed(PeerId, LinkId, String),
}

/// Sink handed to a transport at construction.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    peer_id: PeerId,
    link_id: LinkId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportEvents {
    pub(crate) fn new(
        peer_id: PeerId,
        link_id: LinkId,
        tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            peer_id,
            link_id,
            tx,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn link_id(&self) -> LinkId {
        self.link_id
    }

    pub fn candidate(&self, candidate: IceCandidate) {
        self.emit(TransportEvent::CandidateGenerated(
            self.peer_id.clone(),
            self.link_id,
            candidate,
        ));
    }

    pub fn connected(&self, stream: RemoteStream) {
        self.emit(TransportEvent::Connected(
            self.peer_id.clone(),
            self.link_id,
            stream,
        ));
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.emit(TransportEvent::Failed(
            self.peer_id.clone(),
            self.link_id,
            reason.into(),
        ));
    }

    // Transport callbacks never wait on the session. Events sent after the
    // session ended are dropped.
    fn emit(&self, event: TransportEvent) {
        let _ = self.tx.send(event);
    }
}
