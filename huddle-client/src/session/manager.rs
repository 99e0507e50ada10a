use crate::chat::{ChatNotifier, LogChatNotifier};
use crate::config::SessionConfig;
use crate::error::CallError;
use crate::event::{CallEvent, EventBus};
use crate::media::MediaSource;
use crate::relay::RelayConnector;
use crate::session::session::{Session, SessionCommand, SessionDeps};
use crate::session::snapshot::SessionSnapshot;
use crate::transport::PeerConnector;
use huddle_core::{PeerId, RoomId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

struct ActiveSession {
    room_id: RoomId,
    local_peer_id: PeerId,
    shutdown: oneshot::Sender<()>,
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

/// Entry point for the UI: joins and leaves rooms and publishes
/// [`CallEvent`]s to subscribers.
///
/// Holds at most one session. Dropping the manager ends the session in the
/// background.
pub struct CallManager {
    media: Arc<dyn MediaSource>,
    relay: Arc<dyn RelayConnector>,
    connector: Arc<dyn PeerConnector>,
    chat: Arc<dyn ChatNotifier>,
    config: SessionConfig,
    events: EventBus,
    active: Option<ActiveSession>,
}

impl CallManager {
    pub fn new(
        media: Arc<dyn MediaSource>,
        relay: Arc<dyn RelayConnector>,
        connector: Arc<dyn PeerConnector>,
    ) -> Self {
        Self {
            media,
            relay,
            connector,
            chat: Arc::new(LogChatNotifier),
            config: SessionConfig::default(),
            events: EventBus::new(),
            active: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatNotifier>) -> Self {
        self.chat = chat;
        self
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<CallEvent> {
        self.events.subscribe()
    }

    /// True while a session is running. A session ended by relay loss is
    /// no longer active.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.active
            .as_ref()
            .filter(|active| !active.task.is_finished())
            .map(|active| &active.room_id)
    }

    /// Acquire local media, register with the relay and start the session.
    ///
    /// Joining the room already joined is a no-op. On error no session is
    /// created and the manager accepts another `join`.
    pub async fn join(&mut self, room_id: RoomId, local_peer_id: PeerId) -> Result<(), CallError> {
        self.reap_finished();

        if let Some(active) = &self.active {
            if active.room_id == room_id && active.local_peer_id == local_peer_id {
                debug!("Already in room '{}' as {}", room_id, local_peer_id);
                return Ok(());
            }
            return Err(self.report(CallError::AlreadyJoined(active.room_id.clone())));
        }

        info!("Joining room '{}' as {}", room_id, local_peer_id);

        let local_stream = self
            .media
            .acquire()
            .await
            .map_err(|e| self.report(CallError::MediaUnavailable(e)))?;

        let relay = match self.relay.connect(&room_id, &local_peer_id).await {
            Ok(relay) => relay,
            Err(e) => {
                local_stream.release();
                return Err(self.report(e.into()));
            }
        };

        let (command_tx, command_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let session = Session::new(
            room_id.clone(),
            local_peer_id.clone(),
            local_stream,
            relay,
            command_rx,
            SessionDeps {
                connector: self.connector.clone(),
                events: self.events.clone(),
                chat: self.chat.clone(),
                config: self.config.clone(),
            },
        );
        let task = tokio::spawn(session.run(shutdown_rx));

        self.chat.call_started(&room_id, &local_peer_id);
        self.active = Some(ActiveSession {
            room_id,
            local_peer_id,
            shutdown: shutdown_tx,
            commands: command_tx,
            task,
        });
        Ok(())
    }

    /// End the session and wait for its teardown. No-op without a session.
    pub async fn leave(&mut self) {
        let Some(active) = self.active.take() else {
            debug!("leave: no active session");
            return;
        };

        info!("Leaving room '{}'", active.room_id);
        let _ = active.shutdown.send(());
        if let Err(e) = active.task.await {
            error!("Call session task failed: {}", e);
        }
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let active = self.active.as_ref()?;
        let (tx, rx) = oneshot::channel();
        active
            .commands
            .send(SessionCommand::Snapshot(tx))
            .await
            .ok()?;
        rx.await.ok()
    }

    fn reap_finished(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.task.is_finished())
        {
            debug!("Clearing session that already ended");
            self.active = None;
        }
    }

    fn report(&self, error: CallError) -> CallError {
        error!("Call error: {}", error);
        self.events.publish(CallEvent::Error(error.clone()));
        error
    }
}
