use huddle_core::{PeerId, RoomId};
use tracing::info;

/// Receives call lifecycle system messages for a room's chat.
///
/// Calls are fire-and-forget: implementations must not block the session.
pub trait ChatNotifier: Send + Sync {
    fn call_started(&self, room_id: &RoomId, peer_id: &PeerId);
    fn call_ended(&self, room_id: &RoomId, peer_id: &PeerId);
}

/// Writes the system messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChatNotifier;

impl ChatNotifier for LogChatNotifier {
    fn call_started(&self, room_id: &RoomId, peer_id: &PeerId) {
        info!("[room '{}'] {} started a call", room_id, peer_id);
    }

    fn call_ended(&self, room_id: &RoomId, peer_id: &PeerId) {
        info!("[room '{}'] {} left the call", room_id, peer_id);
    }
}
