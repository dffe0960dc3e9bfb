//! TCP media receiver: the admin side of the Capture/Transport service.
//!
//! `begin` binds the admin's media endpoint.  Binding up front means a port
//! conflict is reported before `start` is ever sent to the sender.
//!
//! `pump` then runs on the stream worker thread:
//!
//! 1. Accept connections, dropping any whose source IP is not the selected
//!    sender's.  A stale sender that keeps pushing after being stopped can
//!    therefore never take over the stream.
//! 2. Read length-prefixed frames and hand each to the [`FrameSink`].
//! 3. Return when stop is raised or the sender closes the connection.
//!
//! The listener is non-blocking and the connection has a read timeout, both
//! set to the poll interval, so the stop signal is observed promptly.

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use screencast_core::{FrameDecoder, FrameSink, MediaStream, MediaTransport, StopSignal, TransportError};
use tracing::{debug, info, warn};

/// Default interval at which a blocked accept or read re-checks the stop signal.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const READ_BUFFER_LEN: usize = 64 * 1024;

/// Receives pushed media frames on a local TCP endpoint.
pub struct TcpMediaReceiver {
    bind_addr: SocketAddr,
    sink: Arc<dyn FrameSink>,
    poll_interval: Duration,
}

impl TcpMediaReceiver {
    /// Creates a receiver that binds `bind_addr` for every stream.
    pub fn new(bind_addr: SocketAddr, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            bind_addr,
            sink,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl MediaTransport for TcpMediaReceiver {
    fn begin(&self, peer: SocketAddr) -> Result<Box<dyn MediaStream>, TransportError> {
        let listener = TcpListener::bind(self.bind_addr).map_err(|source| TransportError::Bind {
            addr: self.bind_addr,
            source,
        })?;
        listener.set_nonblocking(true)?;
        debug!(bind = %self.bind_addr, %peer, "media endpoint bound");

        Ok(Box::new(ReceiverStream {
            peer,
            listener,
            sink: Arc::clone(&self.sink),
            poll_interval: self.poll_interval,
            frames: 0,
        }))
    }
}

struct ReceiverStream {
    peer: SocketAddr,
    listener: TcpListener,
    sink: Arc<dyn FrameSink>,
    poll_interval: Duration,
    frames: u64,
}

impl ReceiverStream {
    /// Waits for the selected sender to connect.  `None` means stop was raised.
    fn accept_peer(&self, stop: &StopSignal) -> Result<Option<TcpStream>, TransportError> {
        while !stop.is_raised() {
            match self.listener.accept() {
                Ok((conn, from)) if from.ip() == self.peer.ip() => {
                    info!(%from, "sender connected to media endpoint");
                    return Ok(Some(conn));
                }
                Ok((_, from)) => {
                    warn!(%from, expected = %self.peer.ip(), "dropping media connection from unselected host");
                }
                Err(e) if is_retryable(&e) => std::thread::sleep(self.poll_interval),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

impl MediaStream for ReceiverStream {
    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn pump(&mut self, stop: &StopSignal) -> Result<(), TransportError> {
        let Some(mut conn) = self.accept_peer(stop)? else {
            return Ok(());
        };
        // Accepted sockets inherit non-blocking mode on some platforms.
        conn.set_nonblocking(false)?;
        conn.set_read_timeout(Some(self.poll_interval))?;

        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; READ_BUFFER_LEN];

        while !stop.is_raised() {
            match conn.read(&mut buf) {
                Ok(0) => {
                    info!(peer = %self.peer, "sender closed media connection");
                    if decoder.buffered() > 0 {
                        warn!(bytes = decoder.buffered(), "discarding partial frame");
                    }
                    return Ok(());
                }
                Ok(n) => {
                    decoder.push(&buf[..n]);
                    while let Some(frame) = decoder.next_frame()? {
                        self.frames += 1;
                        self.sink.on_frame(&frame);
                    }
                }
                Err(e) if is_retryable(&e) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn end(self: Box<Self>) {
        info!(peer = %self.peer, frames = self.frames, "media endpoint released");
    }
}

fn is_retryable(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::media::LoggingFrameSink;
    use screencast_core::{write_frame, StreamWorker};
    use std::time::Instant;

    /// Finds a free loopback port by binding port 0 and releasing it.
    fn free_addr() -> SocketAddr {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap()
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn receiver(bind: SocketAddr, sink: &Arc<LoggingFrameSink>) -> TcpMediaReceiver {
        TcpMediaReceiver::new(bind, Arc::clone(sink) as Arc<dyn FrameSink>)
            .with_poll_interval(Duration::from_millis(20))
    }

    #[test]
    fn test_frames_from_peer_reach_sink() {
        // Arrange
        let bind = free_addr();
        let sink = Arc::new(LoggingFrameSink::new(0));
        let stream = receiver(bind, &sink).begin(bind).unwrap();
        let worker = StreamWorker::spawn(stream, "rx-test").unwrap();

        // Act
        let mut conn = TcpStream::connect(bind).unwrap();
        write_frame(&mut conn, b"frame-1").unwrap();
        write_frame(&mut conn, b"frame-22").unwrap();

        // Assert
        assert!(wait_until(|| sink.frames() == 2));
        assert_eq!(sink.bytes(), 15);
        assert!(worker.join().is_ok());
    }

    #[test]
    fn test_begin_fails_when_endpoint_in_use() {
        // Arrange
        let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
        let bind = occupied.local_addr().unwrap();
        let sink = Arc::new(LoggingFrameSink::new(0));

        // Act
        let result = receiver(bind, &sink).begin(bind);

        // Assert
        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[test]
    fn test_connection_from_other_host_is_dropped() {
        // Arrange: the selected peer is not loopback, so the loopback connection is foreign
        let bind = free_addr();
        let sink = Arc::new(LoggingFrameSink::new(0));
        let peer: SocketAddr = "10.255.255.1:9999".parse().unwrap();
        let stream = receiver(bind, &sink).begin(peer).unwrap();
        let worker = StreamWorker::spawn(stream, "rx-foreign").unwrap();

        // Act
        let mut conn = TcpStream::connect(bind).unwrap();
        let _ = write_frame(&mut conn, b"intruder");
        std::thread::sleep(Duration::from_millis(200));

        // Assert
        assert_eq!(sink.frames(), 0);
        assert!(worker.join().is_ok());
    }

    #[test]
    fn test_pump_returns_when_sender_closes() {
        // Arrange
        let bind = free_addr();
        let sink = Arc::new(LoggingFrameSink::new(0));
        let stream = receiver(bind, &sink).begin(bind).unwrap();
        let worker = StreamWorker::spawn(stream, "rx-close").unwrap();

        // Act
        let mut conn = TcpStream::connect(bind).unwrap();
        write_frame(&mut conn, b"last").unwrap();
        drop(conn);

        // Assert
        assert!(wait_until(|| !worker.is_alive()), "worker must exit on EOF");
        assert_eq!(sink.frames(), 1);
        assert!(worker.join().is_ok());
    }

    #[test]
    fn test_endpoint_rebinds_after_stream_ends() {
        // Arrange
        let bind = free_addr();
        let sink = Arc::new(LoggingFrameSink::new(0));
        let rx = receiver(bind, &sink);
        let first = StreamWorker::spawn(rx.begin(bind).unwrap(), "rx-1").unwrap();

        // Act
        first.join().unwrap();
        let second = rx.begin(bind);

        // Assert
        assert!(second.is_ok(), "endpoint must be free after the stream ended");
    }
}
