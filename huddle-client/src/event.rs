use crate::error::CallError;
use crate::media::RemoteStream;
use dashmap::DashMap;
use huddle_core::{PeerId, RoomId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// `leave()` was called or the manager was dropped.
    Left,
    /// The relay connection closed underneath the session.
    RelayLost,
}

/// Notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    RemoteStreamAvailable {
        peer_id: PeerId,
        stream: RemoteStream,
    },
    RemoteStreamEnded {
        peer_id: PeerId,
        stream_id: String,
    },
    /// The link to `peer_id` is gone; `error` is a `NegotiationFailed`.
    ConnectionFailed {
        peer_id: PeerId,
        error: CallError,
    },
    /// Non-fatal problem; the session keeps running.
    Error(CallError),
    SessionEnded {
        room_id: RoomId,
        reason: EndReason,
    },
}

/// Fan-out of [`CallEvent`]s to any number of subscribers.
///
/// Each subscriber sees events in publication order. Subscribers whose
/// receiver was dropped are pruned on the next publish.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<DashMap<u64, mpsc::UnboundedSender<CallEvent>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CallEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);
        rx
    }

    pub fn publish(&self, event: CallEvent) {
        self.subscribers
            .retain(|_, subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
