use crate::media::MediaError;
use crate::relay::RelayError;
use huddle_core::{EnvelopeKind, PeerId, RoomId};
use thiserror::Error;

/// Coarse classification of [`CallError`], stable for UI matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MediaUnavailable,
    RelayUnreachable,
    UnexpectedAnswer,
    UnexpectedEnvelope,
    NegotiationFailed,
    AlreadyJoined,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("local media unavailable: {0}")]
    MediaUnavailable(#[from] MediaError),

    #[error("relay unreachable: {0}")]
    RelayUnreachable(String),

    #[error("ANSWER from {0} does not match any peer link")]
    UnexpectedAnswer(PeerId),

    #[error("discarded {kind} from {from}: {detail}")]
    UnexpectedEnvelope {
        kind: EnvelopeKind,
        from: PeerId,
        detail: String,
    },

    #[error("negotiation with {peer_id} failed: {reason}")]
    NegotiationFailed { peer_id: PeerId, reason: String },

    #[error("already in room '{0}', leave it first")]
    AlreadyJoined(RoomId),
}

impl CallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::MediaUnavailable(_) => ErrorKind::MediaUnavailable,
            CallError::RelayUnreachable(_) => ErrorKind::RelayUnreachable,
            CallError::UnexpectedAnswer(_) => ErrorKind::UnexpectedAnswer,
            CallError::UnexpectedEnvelope { .. } => ErrorKind::UnexpectedEnvelope,
            CallError::NegotiationFailed { .. } => ErrorKind::NegotiationFailed,
            CallError::AlreadyJoined(_) => ErrorKind::AlreadyJoined,
        }
    }

    /// Join-time failures after which the manager accepts another `join`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MediaUnavailable | ErrorKind::RelayUnreachable
        )
    }
}

impl From<RelayError> for CallError {
    fn from(e: RelayError) -> Self {
        CallError::RelayUnreachable(e.to_string())
    }
}
