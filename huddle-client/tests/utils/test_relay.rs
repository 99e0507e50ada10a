use std::net::SocketAddr;
use std::time::Duration;

use huddle_core::{PeerId, RoomId};
use huddle_relay::{RelayConfig, RelayHub, serve_on};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A relay server on an ephemeral local port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub hub: RelayHub,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestRelay {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test relay");
        let addr = listener.local_addr().expect("Listener has no address");
        let hub = RelayHub::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let config = RelayConfig {
            bind: addr,
            heartbeat_interval: Duration::from_secs(30),
        };
        tokio::spawn(serve_on(listener, config, hub.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            hub,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait until the hub lists exactly `expected` in `room`.
    pub async fn wait_for_members(&self, room: &str, expected: &[&str], timeout_ms: u64) -> bool {
        let room = RoomId::from(room);
        let expected: Vec<PeerId> = expected.iter().map(|id| PeerId::from(*id)).collect();
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        loop {
            if self.hub.members(&room) == expected {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
