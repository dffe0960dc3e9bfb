//! The outbound half of the control channel, as seen by the use cases.
//!
//! Every command is a one-shot delivery: open a connection, write one token,
//! close.  Success means the write completed; nothing is read back.  A failed
//! delivery is therefore never ambiguous: the command either reached the
//! sender's socket or it did not.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use screencast_core::ControlMessage;
use thiserror::Error;

/// The step of a delivery that exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStage {
    Connect,
    Write,
}

impl fmt::Display for ControlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlStage::Connect => f.write_str("connect"),
            ControlStage::Write => f.write_str("write"),
        }
    }
}

/// Error type for control-command delivery.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The sender refused or could not be reached.
    #[error("failed to connect to control endpoint {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The connection opened but the command could not be written.
    #[error("failed to write command to {addr}: {source}")]
    Write {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The sender did not respond within the configured budget.
    #[error("{stage} to {addr} timed out after {after:?}")]
    Timeout {
        addr: SocketAddr,
        stage: ControlStage,
        after: Duration,
    },
}

/// Delivers control commands to senders.
#[async_trait]
pub trait ControlSender: Send + Sync {
    /// Sends `message` to the sender at `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError`] if the command was not delivered.
    async fn send(&self, peer: IpAddr, message: ControlMessage) -> Result<(), ControlError>;
}
