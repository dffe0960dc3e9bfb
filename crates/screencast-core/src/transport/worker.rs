//! The background thread that drives one media stream.
//!
//! A [`StreamWorker`] owns its stream for the whole lifetime of the thread and
//! calls [`MediaStream::end`] exactly once when pumping returns, even if the
//! pump panics or the thread could never be spawned.  Callers therefore only
//! ever deal with two operations:
//!
//! - [`StreamWorker::join`] – raise the stop signal and block until the stream
//!   has been released (the admin's stop path).
//! - [`StreamWorker::stop_detached`] – raise the stop signal and return
//!   immediately (the sender's fire-and-forget stop path).
//!
//! Dropping a worker raises the stop signal as well, so a handle lost to a
//! cancelled future never leaves its stream pumping.

use std::net::SocketAddr;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use super::{MediaStream, StopSignal, TransportError};

/// Handle to a running stream worker thread.
#[derive(Debug)]
pub struct StreamWorker {
    peer: SocketAddr,
    stop: StopSignal,
    thread: Option<JoinHandle<Result<(), TransportError>>>,
}

impl StreamWorker {
    /// Spawns a named thread that pumps `stream` until stopped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spawn`] if the OS refuses to create the
    /// thread.  The stream has already been ended when this happens.
    pub fn spawn(stream: Box<dyn MediaStream>, name: &str) -> Result<Self, TransportError> {
        let peer = stream.peer();
        let stop = StopSignal::new();
        let worker_stop = stop.clone();
        let mut guard = EndOnDrop(Some(stream));

        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = match guard.0.as_mut() {
                    Some(stream) => stream.pump(&worker_stop),
                    None => Ok(()),
                };
                match &result {
                    Ok(()) => debug!(%peer, "stream pump returned"),
                    Err(e) => warn!(%peer, "stream pump failed: {e}"),
                }
                drop(guard);
                result
            })
            .map_err(TransportError::Spawn)?;

        Ok(Self {
            peer,
            stop,
            thread: Some(thread),
        })
    }

    /// The endpoint the stream was opened for.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// `true` while the worker thread has not finished.
    pub fn is_alive(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Raises the stop signal and blocks until the stream has been ended.
    ///
    /// Returns the pump's own result so callers can report a stream that
    /// failed before it was asked to stop.
    ///
    /// # Errors
    ///
    /// Returns the pump's error, or [`TransportError::WorkerPanicked`].
    pub fn join(mut self) -> Result<(), TransportError> {
        self.stop.raise();
        match self.thread.take() {
            Some(thread) => thread.join().unwrap_or(Err(TransportError::WorkerPanicked)),
            None => Ok(()),
        }
    }

    /// Raises the stop signal without waiting for the thread.
    pub fn stop_detached(mut self) {
        self.stop.raise();
        self.thread.take();
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        if self.thread.is_some() {
            debug!(peer = %self.peer, "stream worker dropped; raising stop");
            self.stop.raise();
        }
    }
}

/// Ends the wrapped stream when dropped.
struct EndOnDrop(Option<Box<dyn MediaStream>>);

impl Drop for EndOnDrop {
    fn drop(&mut self) {
        if let Some(stream) = self.0.take() {
            stream.end();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
