//! Screencast sender entry point.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config (file, then CLI overrides)
//!  └─ start services
//!       ├─ Beacon           (Tokio task)  ── UDP "hello" ──► admin
//!       └─ ControlListener  (Tokio task)  ◄── "start"/"stop" ── admin
//!             └─ StreamAgent ── TcpMediaPusher ── frames ──► admin
//!  └─ Ctrl-C: stop both loops, stop and join the active stream (bounded)
//! ```
//!
//! # Usage
//!
//! ```text
//! screencast-sender [OPTIONS]
//!
//! Options:
//!   --config <PATH>            Config file [default: <platform dir>/sender.toml]
//!   --admin-address <IP>       Admin to announce to and stream to [default: 127.0.0.1]
//!   --discovery-port <PORT>    Admin's UDP beacon port [default: 8888]
//!   --control-port <PORT>      Local TCP control port [default: 7777]
//!   --media-port <PORT>        Admin's TCP media port [default: 9999]
//!   --frame-rate <FPS>         Frames pushed per second [default: 30]
//!   --log-level <LEVEL>        Used when RUST_LOG is unset [default: info]
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use screencast_sender::application::stream_agent::StreamAgent;
use screencast_sender::infrastructure::media::TcpMediaPusher;
use screencast_sender::infrastructure::network::beacon::Beacon;
use screencast_sender::infrastructure::network::control_listener::ControlListener;
use screencast_sender::infrastructure::storage::config::{self, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screencast sender agent.
///
/// Announces this machine to the admin and streams its screen on command.
#[derive(Debug, Parser)]
#[command(
    name = "screencast-sender",
    about = "Announce this machine to a Screencast admin and stream on command",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "SCREENCAST_SENDER_CONFIG")]
    config: Option<PathBuf>,

    /// IP address of the admin console.
    #[arg(long, env = "SCREENCAST_ADMIN_ADDRESS")]
    admin_address: Option<IpAddr>,

    /// Admin's UDP discovery port.
    #[arg(long, env = "SCREENCAST_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// Local TCP port for control commands.
    #[arg(long, env = "SCREENCAST_CONTROL_PORT")]
    control_port: Option<u16>,

    /// Admin's TCP media port.
    #[arg(long, env = "SCREENCAST_MEDIA_PORT")]
    media_port: Option<u16>,

    /// Frames pushed per second while streaming.
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => config::load_config().context("failed to load sender config")?,
        };

        if let Some(addr) = self.admin_address {
            cfg.network.admin_address = addr;
        }
        if let Some(port) = self.discovery_port {
            cfg.network.discovery_port = port;
        }
        if let Some(port) = self.control_port {
            cfg.network.control_port = port;
        }
        if let Some(port) = self.media_port {
            cfg.network.media_port = port;
        }
        if let Some(fps) = self.frame_rate {
            cfg.media.frame_rate = fps;
        }
        if let Some(level) = self.log_level {
            cfg.sender.log_level = level;
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.sender.log_level)),
        )
        .init();

    info!(admin = %cfg.network.admin_address, "Screencast sender starting");

    // Shutdown flag shared across all background services.
    let running = Arc::new(AtomicBool::new(true));

    // ── Stream agent ──────────────────────────────────────────────────────────
    let pusher = TcpMediaPusher::new(
        cfg.media.connect_timeout(),
        cfg.media.frame_rate,
        cfg.media.frame_size,
    );
    let agent = Arc::new(StreamAgent::new(Arc::new(pusher), cfg.network.media_target()));

    // ── Background loops ──────────────────────────────────────────────────────
    let beacon = Beacon::bind(cfg.network.discovery_target(), cfg.beacon.interval())
        .await
        .context("beacon socket is required")?;
    let listener = ControlListener::bind(
        cfg.network.control_bind(),
        Arc::clone(&agent),
        cfg.control.read_timeout(),
    )
    .await
    .context("control listener is required")?;

    let beacon_task = tokio::spawn(beacon.run(Arc::clone(&running)));
    let listener_task = tokio::spawn(listener.run(Arc::clone(&running)));

    info!("Screencast sender ready.  Press Ctrl-C to exit.");

    // ── Ctrl-C ────────────────────────────────────────────────────────────────
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
    }
    info!("shutdown signal received");
    running.store(false, Ordering::Relaxed);

    // ── Shutdown ──────────────────────────────────────────────────────────────
    let budget = cfg.sender.shutdown_timeout();
    let stop_all = async move {
        let _ = beacon_task.await;
        let _ = listener_task.await;
        tokio::task::spawn_blocking(move || agent.shutdown()).await
    };
    match timeout(budget, stop_all).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("stream ended with error: {e}"),
        Ok(Err(e)) => warn!("stream shutdown task failed: {e}"),
        Err(_) => warn!("shutdown timed out after {budget:?}"),
    }

    info!("Screencast sender stopped");
    Ok(())
}
