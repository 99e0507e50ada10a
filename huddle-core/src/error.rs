use crate::model::{EnvelopeKind, SdpType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid envelope json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} envelope has no matching body")]
    MalformedPayload { kind: EnvelopeKind },

    #[error("{kind} envelope carries a {found:?} description")]
    SdpTypeMismatch { kind: EnvelopeKind, found: SdpType },
}
