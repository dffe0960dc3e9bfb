//! StreamAgent: the sender's single outbound stream slot.
//!
//! | Command | Slot empty          | Live worker        | Dead worker         |
//! |---------|---------------------|--------------------|---------------------|
//! | `start` | begin, spawn worker | ignored            | reap, then begin    |
//! | `stop`  | ignored             | signal, clear slot | clear slot          |
//!
//! `stop` does not wait for the worker: the command connection is answered
//! straight away and the worker releases its stream on its own thread within
//! one frame interval.  Only [`StreamAgent::shutdown`] joins.
//!
//! All methods block (opening a stream connects to the admin), so async
//! callers run them on the blocking pool.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use screencast_core::{ControlMessage, MediaTransport, StreamWorker, TransportError};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const WORKER_THREAD_NAME: &str = "screencast-tx";

/// Error type for stream agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The outbound stream could not be opened or its worker not started.
    #[error("failed to start stream to {admin}: {source}")]
    StartFailed {
        admin: SocketAddr,
        #[source]
        source: TransportError,
    },
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOutcome {
    Started,
    /// `start` while a stream is live; nothing changed.
    AlreadyStreaming,
    Stopped,
    /// `stop` with nothing running; nothing changed.
    NotStreaming,
}

struct Slot {
    stream_id: Uuid,
    worker: StreamWorker,
}

/// Reacts to control commands by starting and stopping the outbound stream.
pub struct StreamAgent {
    slot: Mutex<Option<Slot>>,
    transport: Arc<dyn MediaTransport>,
    admin_media: SocketAddr,
}

impl StreamAgent {
    /// Creates an agent that streams to `admin_media` through `transport`.
    pub fn new(transport: Arc<dyn MediaTransport>, admin_media: SocketAddr) -> Self {
        Self {
            slot: Mutex::new(None),
            transport,
            admin_media,
        }
    }

    /// Dispatches one control command.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::StartFailed`] if `start` could not open the
    /// stream.  The slot stays empty in that case.
    pub fn handle(&self, message: ControlMessage) -> Result<AgentOutcome, AgentError> {
        match message {
            ControlMessage::Start => self.start(),
            ControlMessage::Stop => Ok(self.stop()),
        }
    }

    /// Starts streaming unless a stream is already live.
    ///
    /// # Errors
    ///
    /// See [`StreamAgent::handle`].
    pub fn start(&self) -> Result<AgentOutcome, AgentError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(current) = slot.as_ref() {
            if current.worker.is_alive() {
                info!(stream_id = %current.stream_id, "already streaming; start ignored");
                return Ok(AgentOutcome::AlreadyStreaming);
            }
        }
        if let Some(dead) = slot.take() {
            match dead.worker.join() {
                Ok(()) => info!(stream_id = %dead.stream_id, "reaped finished stream"),
                Err(e) => warn!(stream_id = %dead.stream_id, "reaped failed stream: {e}"),
            }
        }

        let admin = self.admin_media;
        let stream = self
            .transport
            .begin(admin)
            .map_err(|source| AgentError::StartFailed { admin, source })?;
        let worker = StreamWorker::spawn(stream, WORKER_THREAD_NAME)
            .map_err(|source| AgentError::StartFailed { admin, source })?;

        let stream_id = Uuid::new_v4();
        info!(%stream_id, %admin, "streaming started");
        *slot = Some(Slot { stream_id, worker });
        Ok(AgentOutcome::Started)
    }

    /// Signals the current stream to stop and clears the slot without waiting.
    pub fn stop(&self) -> AgentOutcome {
        let taken = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match taken {
            Some(Slot { stream_id, worker }) => {
                worker.stop_detached();
                info!(%stream_id, "streaming stopped");
                AgentOutcome::Stopped
            }
            None => {
                info!("not streaming; stop ignored");
                AgentOutcome::NotStreaming
            }
        }
    }

    /// `true` while the slot holds a live worker.
    pub fn is_streaming(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|s| s.worker.is_alive())
    }

    /// Stops the current stream and waits for it to be released.
    ///
    /// # Errors
    ///
    /// Returns the stream's own error if it had failed.
    pub fn shutdown(&self) -> Result<(), TransportError> {
        let taken = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match taken {
            Some(Slot { stream_id, worker }) => {
                info!(%stream_id, "stopping stream for shutdown");
                worker.join()
            }
            None => Ok(()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
