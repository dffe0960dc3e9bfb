//! Recording transport for tests.
//!
//! The real transports open sockets, move bytes, and cannot be observed from a
//! test without a peer on the other end.  `RecordingTransport` replaces all of
//! that with in-memory bookkeeping:
//!
//! - every `begin` and `end` is appended to an ordered event log,
//! - the number of currently open streams is tracked together with the
//!   highest value it ever reached, so "at most one stream open" can be
//!   asserted after any sequence of operations.
//!
//! Streams pump by sleeping in short slices until their stop signal is raised.
//!
//! # Failure injection
//!
//! - [`RecordingTransport::fail_next_begin`] makes the next `begin` return
//!   [`TransportError::Unavailable`] without opening anything.
//! - [`RecordingTransport::set_pump_fails`] makes every new stream's `pump`
//!   return an error immediately, simulating a stream that dies on its own.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::{Duration, Instant};

use super::{MediaStream, MediaTransport, StopSignal, TransportError};

const PUMP_SLICE: Duration = Duration::from_millis(5);

/// One recorded transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Begin(SocketAddr),
    End(SocketAddr),
}

#[derive(Debug, Default)]
struct Shared {
    events: Mutex<Vec<TransportEvent>>,
    open: AtomicUsize,
    max_open: AtomicUsize,
    fail_next_begin: AtomicBool,
    pump_fails: AtomicBool,
}

impl Shared {
    fn record(&self, event: TransportEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

/// A [`MediaTransport`] that records calls instead of moving media.
///
/// Cloning shares the underlying log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    shared: Arc<Shared>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `begin` call fail.
    pub fn fail_next_begin(&self) {
        self.shared.fail_next_begin.store(true, Ordering::SeqCst);
    }

    /// When `true`, streams opened afterwards fail as soon as they are pumped.
    pub fn set_pump_fails(&self, fails: bool) {
        self.shared.pump_fails.store(fails, Ordering::SeqCst);
    }

    /// Snapshot of every recorded call, in order.
    pub fn events(&self) -> Vec<TransportEvent> {
        self.shared
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Peers passed to successful `begin` calls, in order.
    pub fn begins(&self) -> Vec<SocketAddr> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TransportEvent::Begin(addr) => Some(addr),
                TransportEvent::End(_) => None,
            })
            .collect()
    }

    /// Peers whose streams were ended, in order.
    pub fn ends(&self) -> Vec<SocketAddr> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                TransportEvent::End(addr) => Some(addr),
                TransportEvent::Begin(_) => None,
            })
            .collect()
    }

    pub fn begin_count(&self) -> usize {
        self.begins().len()
    }

    pub fn end_count(&self) -> usize {
        self.ends().len()
    }

    /// Streams currently open (begun and not yet ended).
    pub fn open_count(&self) -> usize {
        self.shared.open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open streams ever observed.
    pub fn max_concurrent_open(&self) -> usize {
        self.shared.max_open.load(Ordering::SeqCst)
    }

    /// Polls until at least `count` streams have ended or `timeout` elapses.
    ///
    /// Returns `true` if the count was reached.
    pub fn wait_for_ends(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.end_count() >= count {
                return true;
            }
            std::thread::sleep(PUMP_SLICE);
        }
        self.end_count() >= count
    }
}

impl MediaTransport for RecordingTransport {
    fn begin(&self, peer: SocketAddr) -> Result<Box<dyn MediaStream>, TransportError> {
        if self.shared.fail_next_begin.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Unavailable(format!(
                "injected begin failure for {peer}"
            )));
        }

        let open = self.shared.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_open.fetch_max(open, Ordering::SeqCst);
        self.shared.record(TransportEvent::Begin(peer));

        Ok(Box::new(RecordingStream {
            peer,
            fails: self.shared.pump_fails.load(Ordering::SeqCst),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct RecordingStream {
    peer: SocketAddr,
    fails: bool,
    shared: Arc<Shared>,
}

impl MediaStream for RecordingStream {
    fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn pump(&mut self, stop: &StopSignal) -> Result<(), TransportError> {
        if self.fails {
            return Err(TransportError::Unavailable(format!(
                "injected pump failure for {}",
                self.peer
            )));
        }
        while !stop.is_raised() {
            std::thread::sleep(PUMP_SLICE);
        }
        Ok(())
    }

    fn end(self: Box<Self>) {
        self.shared.record(TransportEvent::End(self.peer));
        self.shared.open.fetch_sub(1, Ordering::SeqCst);
    }
}
