pub use huddle_core::{PeerId, RoomId, SignalingEnvelope};

pub mod model {
    pub use huddle_core::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use huddle_relay::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use huddle_client::*;
}
