use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_client::{
    CallEvent, CallManager, EndReason, RtcConnector, SessionConfig, SyntheticMediaSource,
    WsRelayConnector,
};
use huddle_core::{IceServerConfig, PeerId, RoomId};
use huddle_relay::{RelayConfig, RelayHub};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle", version, about = "Call signaling relay and headless participant")]
struct Cli {
    /// Log filter, e.g. `info` or `huddle_client=debug`.
    #[arg(long, env = "HUDDLE_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, env = "HUDDLE_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Seconds between WebSocket pings.
        #[arg(long, default_value_t = 30)]
        heartbeat_secs: u64,
    },

    /// Join a room and print call events until Ctrl-C.
    Join {
        #[arg(long, env = "HUDDLE_RELAY_URL", default_value = "ws://127.0.0.1:3000")]
        url: String,

        #[arg(short, long)]
        room: String,

        /// Defaults to a random id.
        #[arg(short, long)]
        peer: Option<String>,

        #[arg(long)]
        no_audio: bool,

        #[arg(long)]
        no_video: bool,

        #[arg(long, default_value_t = 30)]
        negotiation_timeout_secs: u64,

        /// STUN server URL; repeatable. Defaults to public STUN servers.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Relay {
            bind,
            heartbeat_secs,
        } => {
            let config = RelayConfig {
                bind,
                heartbeat_interval: Duration::from_secs(heartbeat_secs),
            };
            println!("{}", format!("Starting relay on {bind}").green().bold());
            huddle_relay::serve(config, RelayHub::new(), shutdown_signal()).await?;
        }

        Commands::Join {
            url,
            room,
            peer,
            no_audio,
            no_video,
            negotiation_timeout_secs,
            ice_servers,
        } => {
            let mut config = SessionConfig {
                negotiation_timeout: Duration::from_secs(negotiation_timeout_secs),
                ..SessionConfig::default()
            };
            if !ice_servers.is_empty() {
                config.ice_servers = ice_servers.into_iter().map(IceServerConfig::stun).collect();
            }
            let peer_id = peer.map(PeerId::from).unwrap_or_else(PeerId::random);

            run_participant(&url, RoomId::from(room), peer_id, !no_audio, !no_video, config)
                .await?;
        }
    }

    Ok(())
}

async fn run_participant(
    url: &str,
    room_id: RoomId,
    peer_id: PeerId,
    audio: bool,
    video: bool,
    config: SessionConfig,
) -> Result<()> {
    let relay = WsRelayConnector::new(url)?;
    let connector = RtcConnector::new(config.ice_servers.clone());
    let mut manager = CallManager::new(
        Arc::new(SyntheticMediaSource::new(audio, video)),
        Arc::new(relay),
        Arc::new(connector),
    )
    .with_config(config);
    let mut events = manager.subscribe();

    manager
        .join(room_id.clone(), peer_id.clone())
        .await
        .with_context(|| format!("Failed to join room '{room_id}'"))?;
    println!(
        "{}",
        format!("Joined room '{room_id}' as {peer_id}").green().bold()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, leaving");
                manager.leave().await;
                drain_events(&mut events);
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                let ended = matches!(event, CallEvent::SessionEnded { .. });
                print_event(&event);
                if ended {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn drain_events(events: &mut mpsc::UnboundedReceiver<CallEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

fn print_event(event: &CallEvent) {
    match event {
        CallEvent::PeerJoined(peer_id) => {
            println!("{} {}", "+".green().bold(), peer_id.to_string().cyan());
        }
        CallEvent::PeerLeft(peer_id) => {
            println!("{} {}", "-".yellow().bold(), peer_id.to_string().cyan());
        }
        CallEvent::RemoteStreamAvailable { peer_id, stream } => {
            println!(
                "{} media from {} (stream {}, {} track(s))",
                "▶".green().bold(),
                peer_id.to_string().cyan(),
                stream.id,
                stream.track_ids.len()
            );
        }
        CallEvent::RemoteStreamEnded { peer_id, stream_id } => {
            println!(
                "{}",
                format!("■ stream {stream_id} from {peer_id} ended").dimmed()
            );
        }
        CallEvent::ConnectionFailed { peer_id, error } => {
            println!(
                "{} {}: {}",
                "✗".red().bold(),
                peer_id.to_string().cyan(),
                error.to_string().red()
            );
        }
        CallEvent::Error(e) => {
            println!("{} {}", "!".red().bold(), e.to_string().red());
        }
        CallEvent::SessionEnded { room_id, reason } => {
            let why = match reason {
                EndReason::Left => "left",
                EndReason::RelayLost => "relay connection lost",
            };
            println!(
                "{}",
                format!("Session in room '{room_id}' ended: {why}").bold()
            );
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
