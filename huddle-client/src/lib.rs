//! Call session manager: joins a room through the relay and negotiates one
//! peer connection per remote participant.

mod chat;
mod config;
mod error;
mod event;
pub mod media;
pub mod relay;
pub mod session;
pub mod transport;

pub use chat::{ChatNotifier, LogChatNotifier};
pub use config::SessionConfig;
pub use error::{CallError, ErrorKind};
pub use event::{CallEvent, EndReason, EventBus};
pub use media::{LocalStream, MediaError, MediaSource, RemoteStream, SyntheticMediaSource};
pub use relay::{RelayConnector, RelayError, RelayLink, RelaySender, WsRelayConnector};
pub use session::{CallManager, LinkPhase, NegotiationRole, PeerSnapshot, SessionSnapshot};
pub use transport::{PeerConnector, PeerTransport, RtcConnector, TransportEvents};
