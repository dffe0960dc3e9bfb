//! TCP control listener: accepts one-shot `start` / `stop` commands.
//!
//! Each connection carries exactly one command.  The listener reads until
//! the admin half-closes (at most [`MAX_COMMAND_LEN`] bytes, bounded by a
//! read timeout), parses the token and hands it to the [`StreamAgent`].
//! Unrecognised tokens are logged and ignored.  Nothing is written back.
//!
//! Connections are handled one at a time, so commands are applied in the
//! order they were accepted.
//!
//! # Accept loop
//!
//! `accept()` is wrapped in a 200 ms timeout so the loop can re-check the
//! `running` flag even when no admin is connecting.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use screencast_core::{ControlMessage, MAX_COMMAND_LEN};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::stream_agent::{AgentOutcome, StreamAgent};

const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Error type for the control listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP listener could not be bound.
    #[error("failed to bind control listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Reading a command failed.
    #[error("failed to read command from {peer}: {source}")]
    Read {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The admin did not finish sending within the read timeout.
    #[error("command from {peer} not received within {after:?}")]
    ReadTimeout { peer: SocketAddr, after: Duration },
}

/// Accepts control connections and dispatches commands to the agent.
pub struct ControlListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    agent: Arc<StreamAgent>,
    read_timeout: Duration,
}

impl ControlListener {
    /// Binds the control endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::BindFailed`] if the port cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        agent: Arc<StreamAgent>,
        read_timeout: Duration,
    ) -> Result<Self, ListenerError> {
        let bind_err = |source| ListenerError::BindFailed { addr, source };
        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        Ok(Self {
            listener,
            local_addr,
            agent,
            read_timeout,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until `running` is cleared.
    pub async fn run(self, running: Arc<AtomicBool>) {
        info!("control listener on TCP {}", self.local_addr);

        while running.load(Ordering::Relaxed) {
            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    if let Err(e) = self.serve(stream, peer).await {
                        warn!("{e}");
                    }
                }
                Ok(Err(e)) => error!("control accept error: {e}"),
                Err(_) => {}
            }
        }

        info!("control listener stopped");
    }

    /// Reads one command from `stream` and applies it.
    async fn serve(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), ListenerError> {
        let Some(message) = read_command(stream, peer, self.read_timeout).await? else {
            return Ok(());
        };
        info!(%peer, command = %message, "control command received");

        let agent = Arc::clone(&self.agent);
        match tokio::task::spawn_blocking(move || agent.handle(message)).await {
            Ok(Ok(AgentOutcome::AlreadyStreaming)) => info!("already streaming"),
            Ok(Ok(AgentOutcome::NotStreaming)) => info!("nothing to stop"),
            Ok(Ok(outcome)) => debug!(?outcome, "command applied"),
            Ok(Err(e)) => error!("{e}"),
            Err(e) => error!("stream agent task failed: {e}"),
        }
        Ok(())
    }
}

/// Reads a command token until EOF.  `Ok(None)` means the token was not
/// recognised.
async fn read_command(
    stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
) -> Result<Option<ControlMessage>, ListenerError> {
    let mut buf = Vec::with_capacity(16);
    let mut limited = stream.take(MAX_COMMAND_LEN as u64);

    timeout(read_timeout, limited.read_to_end(&mut buf))
        .await
        .map_err(|_| ListenerError::ReadTimeout {
            peer,
            after: read_timeout,
        })?
        .map_err(|source| ListenerError::Read { peer, source })?;

    let message = ControlMessage::parse(&buf);
    if message.is_none() {
        info!(%peer, bytes = buf.len(), "ignoring unrecognised command");
    }
    Ok(message)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
