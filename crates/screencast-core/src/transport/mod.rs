//! Capture/Transport abstractions shared by the admin and the sender.
//!
//! Moving pixels is an external concern.  This module only fixes the shape of
//! the collaboration:
//!
//! ```text
//! MediaTransport::begin(peer) ──► Box<dyn MediaStream>    (resources acquired)
//!                                   │
//!                     StreamWorker thread: stream.pump(&stop)   (blocks)
//!                                   │
//!                     stop.raise() ─┘ pump returns ──► stream.end()  (released)
//! ```
//!
//! The admin drives a *receiving* stream bound to the chosen sender; the sender
//! drives a *pushing* stream bound to the admin's media endpoint.  Both sides
//! use the same [`StreamWorker`] so the stop-then-join sequence lives in one
//! place.

use std::io;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;

use crate::protocol::frame::FrameError;

pub mod recording;
pub mod worker;

pub use worker::StreamWorker;

/// Errors raised by a Capture/Transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A local listening socket for the stream could not be bound.
    #[error("failed to bind media endpoint {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The remote media endpoint could not be reached.
    #[error("failed to connect to media endpoint {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The stream worker thread could not be spawned.
    #[error("failed to spawn stream worker: {0}")]
    Spawn(#[source] io::Error),

    /// The stream worker panicked instead of returning.
    #[error("stream worker panicked")]
    WorkerPanicked,

    /// A media frame was malformed.
    #[error("media frame error: {0}")]
    Frame(#[from] FrameError),

    /// An I/O error on an established stream.
    #[error("media I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport refused to open a stream for another reason.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Cooperative stop flag observed by a pumping stream.
///
/// Cloning shares the flag.  Raising is idempotent.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the stream to halt at its next check.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Factory for media streams: the `Begin` half of the Capture/Transport
/// Service.
pub trait MediaTransport: Send + Sync {
    /// Acquires the resources for a stream bound to `peer`.
    ///
    /// On the admin, `peer` is the sender's media endpoint; on the sender it
    /// is the admin's media endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the stream cannot be opened.  Nothing is
    /// held when an error is returned.
    fn begin(&self, peer: SocketAddr) -> Result<Box<dyn MediaStream>, TransportError>;
}

/// One open media stream.
pub trait MediaStream: Send {
    /// The endpoint this stream was opened for.
    fn peer(&self) -> SocketAddr;

    /// Moves media until `stop` is raised or the stream fails.
    ///
    /// Blocks the calling thread.  Implementations must check `stop` at least
    /// every few hundred milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the stream terminates abnormally.
    fn pump(&mut self, stop: &StopSignal) -> Result<(), TransportError>;

    /// Releases every resource held by the stream.  Called exactly once,
    /// after `pump` has returned (or without `pump` on a rolled-back start).
    fn end(self: Box<Self>);
}

/// The Presentation Service: consumes each received frame payload.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &[u8]);
}
