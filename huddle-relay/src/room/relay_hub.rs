use crate::room::room_members::{Member, Outbound, RoomMembers};
use dashmap::DashMap;
use huddle_core::{EnvelopeKind, PeerId, RoomId, SignalingEnvelope};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Proof that a connection registered `peer_id` in `room_id`.
///
/// A peer that reconnects gets a new `connection_id`; operations made with a
/// stale registration are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    connection_id: u64,
}

#[derive(Default)]
struct HubInner {
    rooms: DashMap<RoomId, RoomMembers>,
    next_connection_id: AtomicU64,
}

/// Room-scoped signaling broker.
///
/// Forwards envelopes between the peers registered in a room and emits
/// JOIN/LEAVE membership envelopes. Delivery is fire-and-forget.
#[derive(Clone, Default)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, room_id: RoomId, peer_id: PeerId, outbound: Outbound) -> Registration {
        let connection_id = self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let mut room = self.inner.rooms.entry(room_id.clone()).or_default();
        if room
            .insert(peer_id.clone(), Member::new(connection_id, outbound))
            .is_some()
        {
            info!("Peer {} reconnected to room '{}'", peer_id, room_id);
        } else {
            info!("Peer {} joined room '{}'", peer_id, room_id);
        }

        let announced = room.broadcast_except(&peer_id, &SignalingEnvelope::join(peer_id.clone()));
        debug!("JOIN from {} announced to {} member(s)", peer_id, announced);

        Registration {
            room_id,
            peer_id,
            connection_id,
        }
    }

    /// Forward an envelope sent by the registered connection.
    pub fn route(&self, registration: &Registration, mut envelope: SignalingEnvelope) {
        if envelope.from != registration.peer_id {
            warn!(
                "Envelope from {} claimed to be from {}; rewriting sender",
                registration.peer_id, envelope.from
            );
            envelope.from = registration.peer_id.clone();
        }

        match envelope.kind {
            EnvelopeKind::Join => {
                debug!("Ignoring JOIN from {}: membership is implicit", envelope.from);
                return;
            }
            EnvelopeKind::Leave => {
                self.unregister(registration);
                return;
            }
            _ => {}
        }

        let Some(room) = self.inner.rooms.get(&registration.room_id) else {
            debug!("Room '{}' no longer exists", registration.room_id);
            return;
        };
        if !room.is_current(&registration.peer_id, registration.connection_id) {
            debug!(
                "Dropping {} from replaced connection of {}",
                envelope.kind, registration.peer_id
            );
            return;
        }

        match envelope.to.clone() {
            Some(to) if to == registration.peer_id => {
                debug!("Dropping {} addressed to its own sender", envelope.kind);
            }
            Some(to) => {
                let kind = envelope.kind;
                if !room.deliver(&to, envelope) {
                    debug!(
                        "Dropping {} from {} to departed peer {}",
                        kind, registration.peer_id, to
                    );
                }
            }
            None => {
                room.broadcast_except(&registration.peer_id, &envelope);
            }
        }
    }

    /// Remove the registration and announce LEAVE. Returns false when it was
    /// already removed or replaced by a newer connection.
    pub fn unregister(&self, registration: &Registration) -> bool {
        let removed = {
            let Some(mut room) = self.inner.rooms.get_mut(&registration.room_id) else {
                return false;
            };
            if !room.remove_connection(&registration.peer_id, registration.connection_id) {
                return false;
            }
            room.broadcast_except(
                &registration.peer_id,
                &SignalingEnvelope::leave(registration.peer_id.clone()),
            );
            true
        };

        if self
            .inner
            .rooms
            .remove_if(&registration.room_id, |_, room| room.is_empty())
            .is_some()
        {
            info!("Room '{}' is empty, dropped", registration.room_id);
        }

        info!(
            "Peer {} left room '{}'",
            registration.peer_id, registration.room_id
        );
        removed
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<PeerId> {
        self.inner
            .rooms
            .get(room_id)
            .map(|room| room.peer_ids())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }
}
