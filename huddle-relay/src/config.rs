use std::net::SocketAddr;
use std::time::Duration;

/// Relay server settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Interval between WebSocket pings sent to each member.
    pub heartbeat_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}
