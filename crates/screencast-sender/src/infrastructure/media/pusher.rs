//! TCP media pusher: the sender side of the Capture/Transport service.
//!
//! `begin` connects to the admin's media endpoint (bounded by a connect
//! timeout) and creates a fresh [`FrameSource`].  `pump` writes one
//! length-prefixed frame per frame interval until stop is raised or the admin
//! closes the connection.

use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use screencast_core::{write_frame, FrameError, MediaStream, MediaTransport, StopSignal, TransportError};
use tracing::{debug, info};

use super::source::{FrameSource, SyntheticFrameSource};

/// Pushes frames to the admin over TCP.
pub struct TcpMediaPusher {
    connect_timeout: Duration,
    frame_interval: Duration,
    frame_size: usize,
}

impl TcpMediaPusher {
    /// Creates a pusher sending `frame_rate` synthetic frames per second.
    ///
    /// A frame rate of zero is treated as one.
    pub fn new(connect_timeout: Duration, frame_rate: u32, frame_size: usize) -> Self {
        Self {
            connect_timeout,
            frame_interval: Duration::from_secs(1) / frame_rate.max(1),
            frame_size,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

impl MediaTransport for TcpMediaPusher {
    fn begin(&self, peer: SocketAddr) -> Result<Box<dyn MediaStream>, TransportError> {
        let conn = TcpStream::connect_timeout(&peer, self.connect_timeout)
            .map_err(|source| TransportError::Connect { addr: peer, source })?;
        conn.set_nodelay(true)?;
        // A stalled admin must not wedge the worker past a stop request.
        conn.set_write_timeout(Some(self.frame_interval.max(Duration::from_millis(250))))?;
        debug!(%peer, "connected to admin media endpoint");

        Ok(Box::new(PushStream {
            peer,
            conn,
            source: Box::new(SyntheticFrameSource::new(self.frame_size)),
            frame_interval: self.frame_interval,
            frames: 0,
        }))
    }
}

struct PushStream {
    peer: SocketAddr,
    conn: TcpStream,
    source: Box<dyn FrameSource>,
    frame_interval: Duration,
    frames: u64,
}

impl MediaStream for PushStream {
    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn pump(&mut self, stop: &StopSignal) -> Result<(), TransportError> {
        while !stop.is_raised() {
            let started = Instant::now();
            let frame = self.source.next_frame();

            match write_frame(&mut self.conn, &frame) {
                Ok(()) => self.frames += 1,
                Err(FrameError::Io(e)) if is_peer_gone(&e) => {
                    info!(peer = %self.peer, "admin closed media connection");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(rest) = self.frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        Ok(())
    }

    fn end(self: Box<Self>) {
        let _ = self.conn.shutdown(Shutdown::Both);
        info!(peer = %self.peer, frames = self.frames, "media stream closed");
    }
}

fn is_peer_gone(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
