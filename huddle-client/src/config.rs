use huddle_core::IceServerConfig;
use huddle_core::utils::default_ice_servers;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// Per-session tuning.
///
/// Durations are given in milliseconds when deserialized:
/// `{"negotiation_timeout_ms": 30000, "leave_timeout_ms": 2000}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// A link stuck in NEGOTIATING without progress for this long is failed.
    #[serde(rename = "negotiation_timeout_ms", deserialize_with = "millis")]
    pub negotiation_timeout: Duration,
    /// Upper bound on the best-effort LEAVE sent during teardown.
    #[serde(rename = "leave_timeout_ms", deserialize_with = "millis")]
    pub leave_timeout: Duration,
}

impl SessionConfig {
    pub(crate) fn sweep_interval(&self) -> Duration {
        (self.negotiation_timeout / 4).max(MIN_SWEEP_INTERVAL)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            negotiation_timeout: Duration::from_secs(30),
            leave_timeout: Duration::from_secs(2),
        }
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
