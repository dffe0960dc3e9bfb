//! UDP beacon listener.
//!
//! The admin binds a UDP socket on the discovery port (default 8888).  Every
//! datagram that arrives is a beacon: the payload is not inspected, only its
//! source IP matters.  Each source IP is recorded in the [`SenderRegistry`],
//! which de-duplicates repeated beacons from the same sender.
//!
//! The listener runs on a dedicated thread to avoid blocking the Tokio
//! runtime with synchronous socket I/O.
//!
//! # How beacon discovery works (for beginners)
//!
//! Each sender fires a tiny UDP datagram at the admin every few seconds.
//! UDP does not guarantee delivery, but that does not matter here: a lost
//! beacon is replaced by the next one.  The admin never replies; it only
//! remembers who has spoken.
//!
//! # Read timeout
//!
//! The socket is configured with a 500 ms read timeout.  `recv_from` blocks
//! for at most that long before returning a timeout error.  On each wake-up
//! the loop prunes expired senders (when expiry is configured) and checks
//! its stop flag; once the flag is cleared the thread exits cleanly.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::manage_senders::{Observation, SenderRegistry};

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const RECV_BUFFER_LEN: usize = 1024;

/// Error type for the discovery listener.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The socket could not be configured after binding.
    #[error("failed to configure discovery socket: {0}")]
    Configure(#[source] std::io::Error),
    /// The listener thread could not be started.
    #[error("failed to spawn discovery thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Handle to the running discovery listener.
#[derive(Debug)]
pub struct DiscoveryListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl DiscoveryListener {
    /// The address the socket is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Clears the stop flag and waits for the thread to exit.
    ///
    /// Returns within roughly one read timeout.
    pub fn shutdown(self) {
        self.running.store(false, Ordering::Relaxed);
        if self.thread.join().is_err() {
            error!("discovery thread panicked");
        }
    }
}

/// Binds a UDP socket on `bind_addr` and spawns a background thread that
/// records every beacon's source in `registry`.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the socket cannot be bound.  This
/// is fatal for the admin: without the listener no sender can be discovered.
pub fn start_discovery_listener(
    bind_addr: SocketAddr,
    registry: Arc<SenderRegistry>,
) -> Result<DiscoveryListener, DiscoveryError> {
    let socket = UdpSocket::bind(bind_addr).map_err(|source| DiscoveryError::BindFailed {
        addr: bind_addr,
        source,
    })?;
    socket
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(DiscoveryError::Configure)?;
    let local_addr = socket.local_addr().map_err(DiscoveryError::Configure)?;

    let running = Arc::new(AtomicBool::new(true));
    let thread_running = Arc::clone(&running);

    let thread = std::thread::Builder::new()
        .name("screencast-discovery".to_string())
        .spawn(move || discovery_loop(socket, registry, thread_running))
        .map_err(DiscoveryError::Spawn)?;

    info!("discovery listener on UDP {local_addr}");
    Ok(DiscoveryListener {
        local_addr,
        running,
        thread,
    })
}

/// The main receive loop executed on the discovery thread.
fn discovery_loop(socket: UdpSocket, registry: Arc<SenderRegistry>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; RECV_BUFFER_LEN];

    while running.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                if registry.observe(src.ip()) == Observation::New {
                    info!(sender = %src.ip(), "new sender discovered");
                } else {
                    debug!(sender = %src.ip(), bytes = len, "beacon");
                }
            }
            Err(e) => {
                if let Some(pause) = recv_error_backoff(&e) {
                    // Transient: e.g. ICMP port-unreachable surfaced on some platforms.
                    warn!("discovery recv error: {e}");
                    std::thread::sleep(pause);
                }
            }
        }

        for expired in registry.prune_stale(Instant::now()) {
            info!(sender = %expired, "sender expired");
        }
    }

    info!("discovery listener stopped");
}

/// How long to pause after a receive error.  `None` for a plain read timeout.
fn recv_error_backoff(e: &std::io::Error) -> Option<Duration> {
    (!is_timeout_error(e)).then_some(READ_TIMEOUT)
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
