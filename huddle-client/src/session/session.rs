use crate::chat::ChatNotifier;
use crate::config::SessionConfig;
use crate::error::CallError;
use crate::event::{CallEvent, EndReason, EventBus};
use crate::media::LocalStream;
use crate::relay::{RelayLink, RelaySender};
use crate::session::peer_link::{NegotiationRole, PeerLink};
use crate::session::snapshot::{PeerSnapshot, SessionSnapshot};
use crate::transport::{LinkId, PeerConnector, TransportEvent, TransportEvents};
use huddle_core::{
    EnvelopeKind, IceCandidate, PeerId, RoomId, SessionDescription, Signal, SignalingEnvelope,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Queries from the manager to a running session.
pub(crate) enum SessionCommand {
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// A link out of `connections` whose transport is not yet closed.
struct RetiredLink {
    link: PeerLink,
    /// Published as `ConnectionFailed` once the transport is closed.
    failure: Option<CallError>,
}

/// Collaborators shared by every session a manager starts.
#[derive(Clone)]
pub(crate) struct SessionDeps {
    pub(crate) connector: Arc<dyn PeerConnector>,
    pub(crate) events: EventBus,
    pub(crate) chat: Arc<dyn ChatNotifier>,
    pub(crate) config: SessionConfig,
}

/// One participant's presence in one room.
///
/// Runs as a single task that owns every peer link. Relay envelopes,
/// transport events, manager queries and the stall sweep are handled one at
/// a time, so a handler never observes another's partial update.
pub(crate) struct Session {
    room_id: RoomId,
    local_peer_id: PeerId,

    /// Released exactly once, after every link is closed.
    local_stream: Option<LocalStream>,

    connections: HashMap<PeerId, PeerLink>,
    /// Drained by `release_retired`, which a cancelled unit may leave
    /// half done; teardown finishes it.
    retired: VecDeque<RetiredLink>,
    next_link_id: u64,

    relay: Box<dyn RelaySender>,
    relay_rx: mpsc::UnboundedReceiver<SignalingEnvelope>,
    relay_degraded: bool,

    // Kept here so `transport_rx` never closes while the session runs.
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,

    command_rx: mpsc::Receiver<SessionCommand>,

    deps: SessionDeps,
}

impl Session {
    pub(crate) fn new(
        room_id: RoomId,
        local_peer_id: PeerId,
        local_stream: LocalStream,
        relay: RelayLink,
        command_rx: mpsc::Receiver<SessionCommand>,
        deps: SessionDeps,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();

        Self {
            room_id,
            local_peer_id,
            local_stream: Some(local_stream),
            connections: HashMap::new(),
            retired: VecDeque::new(),
            next_link_id: 0,
            relay: relay.sender,
            relay_rx: relay.inbound,
            relay_degraded: false,
            transport_tx,
            transport_rx,
            command_rx,
            deps,
        }
    }

    /// Event loop. Returns after full teardown.
    ///
    /// Resolving `shutdown` (or dropping its sender) cancels whatever unit is
    /// in flight; its eventual result is discarded.
    pub(crate) async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        info!(
            "Call session started: {} in room '{}'",
            self.local_peer_id, self.room_id
        );

        let mut sweep = time::interval(self.deps.config.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break EndReason::Left,

                envelope = self.relay_rx.recv() => {
                    let Some(envelope) = envelope else {
                        warn!("Relay connection lost for room '{}'", self.room_id);
                        break EndReason::RelayLost;
                    };
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break EndReason::Left,
                        _ = self.handle_envelope(envelope) => {}
                    }
                }

                evt = self.transport_rx.recv() => {
                    let Some(event) = evt else {
                        warn!("Transport channel closed unexpectedly");
                        break EndReason::Left;
                    };
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break EndReason::Left,
                        _ = self.handle_transport_event(event) => {}
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c),
                        None => {
                            info!("Command channel closed. Ending session.");
                            break EndReason::Left;
                        }
                    }
                }

                _ = sweep.tick() => {
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break EndReason::Left,
                        _ = self.expire_stalled_links() => {}
                    }
                }
            }
        };

        self.teardown(reason).await;
    }

    fn handle_command(&self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let mut peers: Vec<PeerSnapshot> = self
            .connections
            .values()
            .map(|link| PeerSnapshot {
                peer_id: link.remote_peer_id().clone(),
                role: link.role(),
                phase: link.phase(),
                has_remote_description: link.has_remote_description(),
                pending_candidates: link.pending_candidate_count(),
            })
            .collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));

        SessionSnapshot {
            room_id: self.room_id.clone(),
            local_peer_id: self.local_peer_id.clone(),
            peers,
            holds_local_stream: self.local_stream.is_some(),
            relay_degraded: self.relay_degraded,
        }
    }

    async fn handle_envelope(&mut self, envelope: SignalingEnvelope) {
        if envelope.from == self.local_peer_id {
            debug!("Ignoring {} echoed back from the relay", envelope.kind);
            return;
        }
        if envelope.to.as_ref().is_some_and(|to| *to != self.local_peer_id) {
            debug!("Ignoring {} addressed to another peer", envelope.kind);
            return;
        }

        let signal = match envelope.signal() {
            Ok(signal) => signal,
            Err(e) => {
                self.discard(CallError::UnexpectedEnvelope {
                    kind: envelope.kind,
                    from: envelope.from,
                    detail: e.to_string(),
                });
                return;
            }
        };

        let from = envelope.from;
        debug!("{} from {}", envelope.kind, from);

        match signal {
            Signal::Join => self.on_peer_joined(from).await,
            Signal::Offer(offer) => self.on_offer(from, offer).await,
            Signal::Answer(answer) => self.on_answer(from, answer).await,
            Signal::IceCandidate(candidate) => self.on_remote_candidate(from, candidate).await,
            Signal::Leave => self.on_peer_left(from).await,
        }
    }

    async fn on_peer_joined(&mut self, peer_id: PeerId) {
        info!("Peer {} joined room '{}'", peer_id, self.room_id);
        self.deps
            .events
            .publish(CallEvent::PeerJoined(peer_id.clone()));

        if let Some(stale) = self.connections.remove(&peer_id) {
            info!("Peer {} rejoined, replacing its link", peer_id);
            self.retire(stale, None);
            self.release_retired().await;
        }
        if !self.open_link(&peer_id, NegotiationRole::Offerer).await {
            return;
        }

        let Some(transport) = self.connections.get(&peer_id).map(|l| l.transport()) else {
            return;
        };
        match transport.create_offer().await {
            Ok(offer) => {
                self.touch(&peer_id);
                self.send_to(&peer_id, Signal::Offer(offer)).await;
            }
            Err(e) => {
                self.fail_link(&peer_id, format!("failed to create offer: {e:#}"))
                    .await
            }
        }
    }

    async fn on_offer(&mut self, from: PeerId, offer: SessionDescription) {
        if self.connections.contains_key(&from) {
            debug!("Renegotiation offer from {}", from);
        } else {
            self.deps.events.publish(CallEvent::PeerJoined(from.clone()));
            if !self.open_link(&from, NegotiationRole::Answerer).await {
                return;
            }
        }

        if let Err(reason) = self.apply_remote_description(&from, offer).await {
            self.fail_link(&from, reason).await;
            return;
        }

        let Some(transport) = self.connections.get(&from).map(|l| l.transport()) else {
            return;
        };
        match transport.create_answer().await {
            Ok(answer) => self.send_to(&from, Signal::Answer(answer)).await,
            Err(e) => {
                self.fail_link(&from, format!("failed to create answer: {e:#}"))
                    .await
            }
        }
    }

    async fn on_answer(&mut self, from: PeerId, answer: SessionDescription) {
        if !self.connections.contains_key(&from) {
            self.discard(CallError::UnexpectedAnswer(from));
            return;
        }
        if let Err(reason) = self.apply_remote_description(&from, answer).await {
            self.fail_link(&from, reason).await;
        }
    }

    async fn on_remote_candidate(&mut self, from: PeerId, candidate: IceCandidate) {
        let Some(link) = self.connections.get_mut(&from) else {
            self.discard(CallError::UnexpectedEnvelope {
                kind: EnvelopeKind::IceCandidate,
                from,
                detail: "no open peer link".into(),
            });
            return;
        };

        if !link.has_remote_description() {
            debug!("Buffering ICE candidate from {} until its description", from);
            link.buffer_candidate(candidate);
            return;
        }

        link.touch();
        let transport = link.transport();
        if let Err(e) = transport.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate from {}: {:#}", from, e);
        }
    }

    async fn on_peer_left(&mut self, peer_id: PeerId) {
        info!("Peer {} left room '{}'", peer_id, self.room_id);
        if let Some(link) = self.connections.remove(&peer_id) {
            self.retire(link, None);
            self.release_retired().await;
        }
        self.deps.events.publish(CallEvent::PeerLeft(peer_id));
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(peer_id, link_id, candidate) => {
                if self.live_link(&peer_id, link_id).is_none() {
                    debug!("Dropping local candidate for closed {}", link_id);
                    return;
                }
                self.send_to(&peer_id, Signal::IceCandidate(candidate)).await;
            }

            TransportEvent::Connected(peer_id, link_id, stream) => {
                let Some(link) = self.live_link(&peer_id, link_id) else {
                    debug!("Dropping media signal for closed {}", link_id);
                    return;
                };
                if link.mark_connected(stream.clone()) {
                    info!("Connected to {}", peer_id);
                    self.deps
                        .events
                        .publish(CallEvent::RemoteStreamAvailable { peer_id, stream });
                }
            }

            TransportEvent::Failed(peer_id, link_id, reason) => {
                if self.live_link(&peer_id, link_id).is_none() {
                    debug!("Dropping failure of closed {}", link_id);
                    return;
                }
                self.fail_link(&peer_id, reason).await;
            }
        }
    }

    async fn expire_stalled_links(&mut self) {
        let now = Instant::now();
        let timeout = self.deps.config.negotiation_timeout;
        let stalled: Vec<PeerId> = self
            .connections
            .values()
            .filter(|link| link.is_stalled(now, timeout))
            .map(|link| link.remote_peer_id().clone())
            .collect();

        for peer_id in stalled {
            self.fail_link(
                &peer_id,
                format!("no negotiation progress for {}s", timeout.as_secs_f32()),
            )
            .await;
        }
    }

    /// Create a link with the local tracks attached. Returns false when no
    /// link was created.
    async fn open_link(&mut self, peer_id: &PeerId, role: NegotiationRole) -> bool {
        if self.relay_degraded {
            warn!("Relay unreachable, not negotiating with {}", peer_id);
            return false;
        }
        let Some(local_stream) = self.local_stream.as_ref() else {
            return false;
        };

        let link_id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        let events = TransportEvents::new(peer_id.clone(), link_id, self.transport_tx.clone());

        match self
            .deps
            .connector
            .connect(peer_id, local_stream, events)
            .await
        {
            Ok(transport) => {
                let mut link = PeerLink::new(link_id, peer_id.clone(), role, transport);
                link.begin_negotiation();
                debug!("Opened {} to {} as {:?}", link_id, peer_id, role);
                self.connections.insert(peer_id.clone(), link);
                true
            }
            Err(e) => {
                error!("Failed to create transport for {}: {:#}", peer_id, e);
                self.deps.events.publish(CallEvent::ConnectionFailed {
                    peer_id: peer_id.clone(),
                    error: CallError::NegotiationFailed {
                        peer_id: peer_id.clone(),
                        reason: format!("failed to create transport: {e:#}"),
                    },
                });
                false
            }
        }
    }

    /// Set the remote description, then apply the candidates buffered
    /// before it, oldest first.
    async fn apply_remote_description(
        &mut self,
        peer_id: &PeerId,
        description: SessionDescription,
    ) -> Result<(), String> {
        let Some(link) = self.connections.get_mut(peer_id) else {
            return Ok(());
        };
        let transport = link.transport();

        transport
            .set_remote_description(description)
            .await
            .map_err(|e| format!("failed to set remote description: {e:#}"))?;

        let pending = link.remote_description_applied();
        if !pending.is_empty() {
            debug!(
                "Flushing {} buffered candidate(s) for {}",
                pending.len(),
                peer_id
            );
        }
        for candidate in pending {
            if let Err(e) = transport.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate for {}: {:#}", peer_id, e);
            }
        }
        Ok(())
    }

    fn live_link(&mut self, peer_id: &PeerId, link_id: LinkId) -> Option<&mut PeerLink> {
        self.connections
            .get_mut(peer_id)
            .filter(|link| link.id() == link_id)
    }

    fn touch(&mut self, peer_id: &PeerId) {
        if let Some(link) = self.connections.get_mut(peer_id) {
            link.touch();
        }
    }

    /// Take a link out of service. Its transport is closed by the next
    /// `release_retired`.
    fn retire(&mut self, mut link: PeerLink, failure: Option<CallError>) {
        if failure.is_some() {
            link.mark_failed();
        } else {
            link.mark_closed();
        }
        self.retired.push_back(RetiredLink { link, failure });
    }

    /// Close retired transports, oldest first. A link leaves the queue only
    /// once its close has finished.
    async fn release_retired(&mut self) {
        while let Some(retired) = self.retired.front_mut() {
            let stream = retired.link.release().await;
            let Some(RetiredLink { link, failure }) = self.retired.pop_front() else {
                break;
            };

            if let Some(stream) = stream {
                self.deps.events.publish(CallEvent::RemoteStreamEnded {
                    peer_id: link.remote_peer_id().clone(),
                    stream_id: stream.id,
                });
            }
            if let Some(error) = failure {
                self.deps.events.publish(CallEvent::ConnectionFailed {
                    peer_id: link.remote_peer_id().clone(),
                    error,
                });
            }
        }
    }

    /// Drop the link for `peer_id` as FAILED. Other links are unaffected.
    async fn fail_link(&mut self, peer_id: &PeerId, reason: String) {
        let Some(link) = self.connections.remove(peer_id) else {
            return;
        };
        warn!("Connection to {} failed: {}", peer_id, reason);

        self.retire(
            link,
            Some(CallError::NegotiationFailed {
                peer_id: peer_id.clone(),
                reason,
            }),
        );
        self.release_retired().await;
    }

    async fn send_to(&mut self, to: &PeerId, signal: Signal) {
        let envelope = SignalingEnvelope::new(self.local_peer_id.clone(), Some(to.clone()), signal);
        let kind = envelope.kind;

        if let Err(e) = self.relay.send(envelope).await {
            error!("Failed to send {} to {}: {}", kind, to, e);
            if !self.relay_degraded {
                self.relay_degraded = true;
                self.deps
                    .events
                    .publish(CallEvent::Error(CallError::from(e)));
            }
        }
    }

    fn discard(&self, error: CallError) {
        warn!("Discarding envelope: {}", error);
        self.deps.events.publish(CallEvent::Error(error));
    }

    /// Close every link (including any left half closed by a cancelled
    /// unit), then release local media, then leave the relay.
    async fn teardown(mut self, reason: EndReason) {
        info!(
            "Ending call session for {} in room '{}' ({:?})",
            self.local_peer_id, self.room_id, reason
        );

        let links: Vec<PeerLink> = self.connections.drain().map(|(_, link)| link).collect();
        for link in links {
            self.retire(link, None);
        }
        self.release_retired().await;

        if let Some(stream) = self.local_stream.take() {
            stream.release();
        }

        if reason == EndReason::Left {
            let leave = SignalingEnvelope::leave(self.local_peer_id.clone());
            match time::timeout(self.deps.config.leave_timeout, self.relay.send(leave)).await {
                Ok(Ok(())) => debug!("LEAVE sent for {}", self.local_peer_id),
                Ok(Err(e)) => warn!("LEAVE not delivered: {}", e),
                Err(_) => warn!("LEAVE timed out"),
            }
        }
        self.relay.close().await;

        self.deps.chat.call_ended(&self.room_id, &self.local_peer_id);
        self.deps.events.publish(CallEvent::SessionEnded {
            room_id: self.room_id.clone(),
            reason,
        });
        info!("Call session for room '{}' finished", self.room_id);
    }
}
