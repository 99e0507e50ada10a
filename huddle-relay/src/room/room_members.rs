use huddle_core::{PeerId, SignalingEnvelope};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Queue feeding one member's WebSocket writer.
pub type Outbound = mpsc::UnboundedSender<SignalingEnvelope>;

pub(crate) struct Member {
    pub(crate) connection_id: u64,
    outbound: Outbound,
}

impl Member {
    pub(crate) fn new(connection_id: u64, outbound: Outbound) -> Self {
        Self {
            connection_id,
            outbound,
        }
    }
}

/// Peers currently registered in one room.
#[derive(Default)]
pub(crate) struct RoomMembers {
    members: HashMap<PeerId, Member>,
}

impl RoomMembers {
    /// Insert a member, returning the connection it replaced.
    pub(crate) fn insert(&mut self, peer_id: PeerId, member: Member) -> Option<Member> {
        self.members.insert(peer_id, member)
    }

    /// Remove `peer_id` only if it is still served by `connection_id`.
    pub(crate) fn remove_connection(&mut self, peer_id: &PeerId, connection_id: u64) -> bool {
        match self.members.get(peer_id) {
            Some(member) if member.connection_id == connection_id => {
                self.members.remove(peer_id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_current(&self, peer_id: &PeerId, connection_id: u64) -> bool {
        self.members
            .get(peer_id)
            .is_some_and(|member| member.connection_id == connection_id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn peer_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.members.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Deliver to a single member. Returns false when the peer is not in the room.
    pub(crate) fn deliver(&self, to: &PeerId, envelope: SignalingEnvelope) -> bool {
        let Some(member) = self.members.get(to) else {
            return false;
        };
        if member.outbound.send(envelope).is_err() {
            debug!("Outbound queue for {} already closed", to);
        }
        true
    }

    /// Deliver to every member except `sender`. Returns the number of recipients.
    pub(crate) fn broadcast_except(&self, sender: &PeerId, envelope: &SignalingEnvelope) -> usize {
        let mut delivered = 0;
        for (peer_id, member) in &self.members {
            if peer_id == sender {
                continue;
            }
            if member.outbound.send(envelope.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}
