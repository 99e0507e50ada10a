pub mod counting_media;
pub mod event_log;
pub mod signal_helpers;
pub mod test_relay;

pub use counting_media::*;
pub use event_log::*;
pub use harness::*;
pub use hub_relay::*;
pub use mock_relay::*;
pub use mock_transport::*;
pub use signal_helpers::*;
pub use test_relay::*;
