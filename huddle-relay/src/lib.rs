//! Room-scoped signaling relay: forwards call negotiation envelopes between
//! the peers registered in a room and announces membership changes.

mod config;
mod room;
mod signaling;

pub use config::RelayConfig;
pub use room::*;
pub use signaling::*;
