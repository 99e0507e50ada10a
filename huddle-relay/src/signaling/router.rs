use crate::config::RelayConfig;
use crate::room::RelayHub;
use crate::signaling::ws_handler::{RelayState, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Relay endpoint: `ws://host/rooms/{room_id}/peers/{peer_id}`.
pub fn router(hub: RelayHub, config: &RelayConfig) -> Router {
    let state = RelayState {
        hub,
        heartbeat_interval: config.heartbeat_interval,
    };

    Router::new()
        .route("/rooms/{room_id}/peers/{peer_id}", get(ws_handler))
        .with_state(state)
}

/// Bind `config.bind` and serve until `shutdown` resolves.
pub async fn serve<F>(config: RelayConfig, hub: RelayHub, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind relay on {}", config.bind))?;

    serve_on(listener, config, hub, shutdown).await
}

/// Serve on an already-bound listener.
pub async fn serve_on<F>(
    listener: TcpListener,
    config: RelayConfig,
    hub: RelayHub,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Signaling relay listening on ws://{}", addr);

    axum::serve(listener, router(hub, &config))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Relay server failed")?;

    info!("Signaling relay stopped");
    Ok(())
}
