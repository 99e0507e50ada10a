mod manager;
mod peer_link;
#[allow(clippy::module_inception)]
mod session;
mod snapshot;

pub use manager::CallManager;
pub use peer_link::{LinkPhase, NegotiationRole};
pub use snapshot::{PeerSnapshot, SessionSnapshot};
