//! Screencast admin console entry point.
//!
//! Wires together the infrastructure services, then hands stdin to the
//! operator console until `quit`, end of input, or Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config (file, then CLI overrides)
//!  └─ start services
//!       ├─ DiscoveryListener     (UDP background thread)  ──► SenderRegistry
//!       ├─ StreamSessionManager  (TcpMediaReceiver + TcpControlClient)
//!       └─ Console               (stdin reader thread + Tokio task)
//!  └─ shutdown: stop the active stream (bounded), stop discovery
//! ```
//!
//! # Usage
//!
//! ```text
//! screencast-admin [OPTIONS]
//!
//! Options:
//!   --config <PATH>            Config file [default: <platform dir>/admin.toml]
//!   --bind-address <IP>        Address for discovery and media sockets
//!   --discovery-port <PORT>    UDP beacon port [default: 8888]
//!   --control-port <PORT>      Senders' TCP control port [default: 7777]
//!   --media-port <PORT>        TCP media endpoint port [default: 9999]
//!   --log-level <LEVEL>        Used when RUST_LOG is unset [default: info]
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use screencast_admin::application::manage_senders::SenderRegistry;
use screencast_admin::application::stream_session::{
    SessionConfig, StopOutcome, StreamSessionManager,
};
use screencast_admin::infrastructure::console::{spawn_stdin_reader, Console};
use screencast_admin::infrastructure::media::{LoggingFrameSink, TcpMediaReceiver};
use screencast_admin::infrastructure::network::control_client::TcpControlClient;
use screencast_admin::infrastructure::network::discovery::start_discovery_listener;
use screencast_admin::infrastructure::storage::config::{self, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Screencast admin console.
///
/// Discovers senders on the LAN and streams from one of them at a time.
#[derive(Debug, Parser)]
#[command(
    name = "screencast-admin",
    about = "Discover screen senders on the LAN and stream from one at a time",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "SCREENCAST_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// IP address the discovery and media sockets bind to.
    #[arg(long, env = "SCREENCAST_BIND_ADDRESS")]
    bind_address: Option<IpAddr>,

    /// UDP port senders send beacons to.
    #[arg(long, env = "SCREENCAST_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// TCP port of each sender's control listener.
    #[arg(long, env = "SCREENCAST_CONTROL_PORT")]
    control_port: Option<u16>,

    /// TCP port of the admin's media endpoint.
    #[arg(long, env = "SCREENCAST_MEDIA_PORT")]
    media_port: Option<u16>,

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
            None => config::load_config().context("failed to load admin config")?,
        };

        if let Some(addr) = self.bind_address {
            cfg.network.bind_address = addr;
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
        if let Some(level) = self.log_level {
            cfg.admin.log_level = level;
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_config()?;

    // Logs go to stderr so console output on stdout stays readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.admin.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Screencast admin starting");

    // ── Discovery ─────────────────────────────────────────────────────────────
    let registry = Arc::new(SenderRegistry::with_expiry(cfg.discovery.sender_expiry()));
    let discovery = start_discovery_listener(cfg.network.discovery_addr(), Arc::clone(&registry))
        .context("discovery listener is required")?;

    // ── Session ───────────────────────────────────────────────────────────────
    let receiver = TcpMediaReceiver::new(
        cfg.network.media_addr(),
        Arc::new(LoggingFrameSink::default()),
    );
    let control = TcpControlClient::new(cfg.network.control_port, cfg.session.control_timeout());
    let session = Arc::new(StreamSessionManager::new(
        Arc::new(receiver),
        Arc::new(control),
        SessionConfig {
            media_port: cfg.network.media_port,
            shutdown_timeout: cfg.session.shutdown_timeout(),
        },
    ));

    // ── Console ───────────────────────────────────────────────────────────────
    let lines = spawn_stdin_reader().context("failed to start console reader")?;
    let events = registry.subscribe();
    let mut console = Console::new(Arc::clone(&registry), Arc::clone(&session), tokio::io::stdout());

    tokio::select! {
        result = console.run(lines, events) => {
            if let Err(e) = result {
                error!("console output failed: {e}");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => warn!("failed to listen for Ctrl-C: {e}"),
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    match session.shutdown().await {
        Ok(StopOutcome::Stopped(report)) => info!(peer = %report.peer, "active stream stopped"),
        Ok(StopOutcome::NothingToStop) => {}
        Err(e) => warn!("{e}"),
    }
    if let Err(e) = tokio::task::spawn_blocking(move || discovery.shutdown()).await {
        warn!("discovery shutdown task failed: {e}");
    }

    info!("Screencast admin stopped");
    Ok(())
}
