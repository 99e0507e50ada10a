use huddle_core::{
    IceCandidate, PeerId, SessionDescription, Signal, SignalingEnvelope,
};

pub fn peer(id: &str) -> PeerId {
    PeerId::from(id)
}

/// JOIN as the relay emits it for a newcomer.
pub fn join(from: &str) -> SignalingEnvelope {
    SignalingEnvelope::join(peer(from))
}

pub fn leave(from: &str) -> SignalingEnvelope {
    SignalingEnvelope::leave(peer(from))
}

pub fn offer(from: &str, to: &str) -> SignalingEnvelope {
    SignalingEnvelope::new(
        peer(from),
        Some(peer(to)),
        Signal::Offer(SessionDescription::offer(format!("offer-sdp-{from}"))),
    )
}

pub fn answer(from: &str, to: &str) -> SignalingEnvelope {
    SignalingEnvelope::new(
        peer(from),
        Some(peer(to)),
        Signal::Answer(SessionDescription::answer(format!("answer-sdp-{from}"))),
    )
}

pub fn candidate(from: &str, to: &str, candidate: &str) -> SignalingEnvelope {
    SignalingEnvelope::new(
        peer(from),
        Some(peer(to)),
        Signal::IceCandidate(IceCandidate::new(candidate)),
    )
}
