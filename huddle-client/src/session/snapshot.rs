use crate::session::peer_link::{LinkPhase, NegotiationRole};
use huddle_core::{PeerId, RoomId};

/// Point-in-time view of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub room_id: RoomId,
    pub local_peer_id: PeerId,
    /// Sorted by peer id.
    pub peers: Vec<PeerSnapshot>,
    pub holds_local_stream: bool,
    /// A relay send failed; no new negotiations are started.
    pub relay_degraded: bool,
}

impl SessionSnapshot {
    pub fn peer(&self, peer_id: &PeerId) -> Option<&PeerSnapshot> {
        self.peers.iter().find(|p| &p.peer_id == peer_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub peer_id: PeerId,
    pub role: NegotiationRole,
    pub phase: LinkPhase,
    pub has_remote_description: bool,
    pub pending_candidates: usize,
}
