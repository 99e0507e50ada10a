use crate::error::ProtocolError;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Same shape as the browser's `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Same shape as the browser's `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvelopeKind {
    Join,
    Leave,
    Offer,
    Answer,
    IceCandidate,
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvelopeKind::Join => "JOIN",
            EnvelopeKind::Leave => "LEAVE",
            EnvelopeKind::Offer => "OFFER",
            EnvelopeKind::Answer => "ANSWER",
            EnvelopeKind::IceCandidate => "ICE_CANDIDATE",
        };
        f.write_str(name)
    }
}

/// Kind-specific body carried in the `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Description(SessionDescription),
    Candidate(IceCandidate),
}

/// Typed view of an envelope body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Join,
    Leave,
    Offer(SessionDescription),
    Answer(SessionDescription),
    IceCandidate(IceCandidate),
}

impl Signal {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Signal::Join => EnvelopeKind::Join,
            Signal::Leave => EnvelopeKind::Leave,
            Signal::Offer(_) => EnvelopeKind::Offer,
            Signal::Answer(_) => EnvelopeKind::Answer,
            Signal::IceCandidate(_) => EnvelopeKind::IceCandidate,
        }
    }
}

/// The unit of exchange over the relay.
///
/// Wire form: `{"type": "OFFER", "from": "a", "to": "b", "data": {...}}`.
/// `to` is omitted for room broadcasts and `data` is omitted for JOIN/LEAVE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingEnvelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub from: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EnvelopeData>,
}

impl SignalingEnvelope {
    pub fn new(from: PeerId, to: Option<PeerId>, signal: Signal) -> Self {
        let kind = signal.kind();
        let data = match signal {
            Signal::Join | Signal::Leave => None,
            Signal::Offer(desc) | Signal::Answer(desc) => Some(EnvelopeData::Description(desc)),
            Signal::IceCandidate(candidate) => Some(EnvelopeData::Candidate(candidate)),
        };
        Self {
            kind,
            from,
            to,
            data,
        }
    }

    pub fn join(from: PeerId) -> Self {
        Self::new(from, None, Signal::Join)
    }

    pub fn leave(from: PeerId) -> Self {
        Self::new(from, None, Signal::Leave)
    }

    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }

    /// Decode the body according to `kind`. JOIN/LEAVE ignore any body.
    pub fn signal(&self) -> Result<Signal, ProtocolError> {
        match (self.kind, &self.data) {
            (EnvelopeKind::Join, _) => Ok(Signal::Join),
            (EnvelopeKind::Leave, _) => Ok(Signal::Leave),
            (EnvelopeKind::Offer, Some(EnvelopeData::Description(desc))) => {
                expect_sdp_type(self.kind, desc, SdpType::Offer)?;
                Ok(Signal::Offer(desc.clone()))
            }
            (EnvelopeKind::Answer, Some(EnvelopeData::Description(desc))) => {
                expect_sdp_type(self.kind, desc, SdpType::Answer)?;
                Ok(Signal::Answer(desc.clone()))
            }
            (EnvelopeKind::IceCandidate, Some(EnvelopeData::Candidate(candidate))) => {
                Ok(Signal::IceCandidate(candidate.clone()))
            }
            (kind, _) => Err(ProtocolError::MalformedPayload { kind }),
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn expect_sdp_type(
    kind: EnvelopeKind,
    desc: &SessionDescription,
    expected: SdpType,
) -> Result<(), ProtocolError> {
    if desc.sdp_type == expected {
        Ok(())
    } else {
        Err(ProtocolError::SdpTypeMismatch {
            kind,
            found: desc.sdp_type,
        })
    }
}
