//! TCP implementation of [`ControlSender`].
//!
//! Each command opens a fresh connection to `<peer>:<control_port>`, writes
//! the command token, shuts down the write half and drops the connection.
//! Connect and write are each bounded by the configured timeout so an
//! unreachable sender never stalls the session manager indefinitely.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use screencast_core::ControlMessage;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::application::control::{ControlError, ControlSender, ControlStage};

/// Sends control commands over one-shot TCP connections.
#[derive(Debug, Clone)]
pub struct TcpControlClient {
    control_port: u16,
    timeout: Duration,
}

impl TcpControlClient {
    /// Creates a client targeting `control_port` on every peer.
    pub fn new(control_port: u16, timeout: Duration) -> Self {
        Self {
            control_port,
            timeout,
        }
    }
}

#[async_trait]
impl ControlSender for TcpControlClient {
    async fn send(&self, peer: IpAddr, message: ControlMessage) -> Result<(), ControlError> {
        let addr = SocketAddr::new(peer, self.control_port);

        let mut stream = timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ControlError::Timeout {
                addr,
                stage: ControlStage::Connect,
                after: self.timeout,
            })?
            .map_err(|source| ControlError::Connect { addr, source })?;

        let write = async {
            stream.write_all(message.to_bytes()).await?;
            stream.shutdown().await?;
            Ok::<(), std::io::Error>(())
        };
        timeout(self.timeout, write)
            .await
            .map_err(|_| ControlError::Timeout {
                addr,
                stage: ControlStage::Write,
                after: self.timeout,
            })?
            .map_err(|source| ControlError::Write { addr, source })?;

        debug!(%addr, command = %message, "control command delivered");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
