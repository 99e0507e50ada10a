use crate::media::RemoteStream;
use crate::transport::{LinkId, PeerTransport};
use huddle_core::{IceCandidate, PeerId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkPhase {
    Created,
    Negotiating,
    Connected,
    Failed,
    Closed,
}

impl LinkPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkPhase::Failed | LinkPhase::Closed)
    }

    fn can_advance_to(self, next: LinkPhase) -> bool {
        use LinkPhase::*;
        matches!(
            (self, next),
            (Created, Negotiating)
                | (Negotiating, Connected)
                | (Negotiating, Failed)
                | (Connected, Failed)
                | (Created | Negotiating | Connected, Closed)
        )
    }
}

/// Negotiation and transport state for one remote peer.
pub(crate) struct PeerLink {
    id: LinkId,
    remote_peer_id: PeerId,
    role: NegotiationRole,
    phase: LinkPhase,
    transport: Arc<dyn PeerTransport>,
    has_remote_description: bool,
    /// Candidates that arrived before the remote description, in arrival order.
    pending_candidates: VecDeque<IceCandidate>,
    remote_stream: Option<RemoteStream>,
    last_progress: Instant,
}

impl PeerLink {
    pub(crate) fn new(
        id: LinkId,
        remote_peer_id: PeerId,
        role: NegotiationRole,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            id,
            remote_peer_id,
            role,
            phase: LinkPhase::Created,
            transport,
            has_remote_description: false,
            pending_candidates: VecDeque::new(),
            remote_stream: None,
            last_progress: Instant::now(),
        }
    }

    pub(crate) fn id(&self) -> LinkId {
        self.id
    }

    pub(crate) fn remote_peer_id(&self) -> &PeerId {
        &self.remote_peer_id
    }

    pub(crate) fn role(&self) -> NegotiationRole {
        self.role
    }

    pub(crate) fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub(crate) fn transport(&self) -> Arc<dyn PeerTransport> {
        self.transport.clone()
    }

    pub(crate) fn has_remote_description(&self) -> bool {
        self.has_remote_description
    }

    pub(crate) fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.len()
    }

    fn advance(&mut self, next: LinkPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            debug!(
                "{} for {}: ignoring {:?} -> {:?}",
                self.id, self.remote_peer_id, self.phase, next
            );
            return false;
        }
        debug!(
            "{} for {}: {:?} -> {:?}",
            self.id, self.remote_peer_id, self.phase, next
        );
        self.phase = next;
        self.touch();
        true
    }

    pub(crate) fn begin_negotiation(&mut self) -> bool {
        self.advance(LinkPhase::Negotiating)
    }

    /// Record negotiation progress for the stall timer.
    pub(crate) fn touch(&mut self) {
        self.last_progress = Instant::now();
    }

    pub(crate) fn is_stalled(&self, now: Instant, timeout: Duration) -> bool {
        self.phase == LinkPhase::Negotiating
            && now.saturating_duration_since(self.last_progress) >= timeout
    }

    pub(crate) fn buffer_candidate(&mut self, candidate: IceCandidate) {
        self.pending_candidates.push_back(candidate);
    }

    /// Mark the remote description as set and hand back the buffered
    /// candidates, oldest first.
    pub(crate) fn remote_description_applied(&mut self) -> Vec<IceCandidate> {
        self.has_remote_description = true;
        self.touch();
        self.pending_candidates.drain(..).collect()
    }

    /// Only the transport's media signal gets a link here.
    pub(crate) fn mark_connected(&mut self, stream: RemoteStream) -> bool {
        if !self.advance(LinkPhase::Connected) {
            return false;
        }
        self.remote_stream = Some(stream);
        true
    }

    pub(crate) fn mark_failed(&mut self) -> bool {
        self.advance(LinkPhase::Failed)
    }

    pub(crate) fn mark_closed(&mut self) -> bool {
        self.advance(LinkPhase::Closed)
    }

    /// Close the transport and hand back the remote stream that ended with
    /// it. Safe to call again if a previous call was cancelled.
    pub(crate) async fn release(&mut self) -> Option<RemoteStream> {
        self.pending_candidates.clear();
        if let Err(e) = self.transport.close().await {
            warn!(
                "Failed to close transport for {}: {:#}",
                self.remote_peer_id, e
            );
        }
        self.remote_stream.take()
    }
}
