//! Frame sink that counts frames instead of displaying them.

use std::sync::atomic::{AtomicU64, Ordering};

use screencast_core::FrameSink;
use tracing::info;

/// Default number of frames between progress lines (about 10 s at 30 fps).
pub const DEFAULT_LOG_EVERY: u64 = 300;

/// Counts received frames and bytes, logging a progress line periodically.
#[derive(Debug)]
pub struct LoggingFrameSink {
    frames: AtomicU64,
    bytes: AtomicU64,
    log_every: u64,
}

impl Default for LoggingFrameSink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_EVERY)
    }
}

impl LoggingFrameSink {
    /// Creates a sink that logs every `log_every` frames.  Zero disables
    /// progress lines.
    pub fn new(log_every: u64) -> Self {
        Self {
            frames: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            log_every,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl FrameSink for LoggingFrameSink {
    fn on_frame(&self, frame: &[u8]) {
        let frames = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        let bytes = self.bytes.fetch_add(frame.len() as u64, Ordering::Relaxed) + frame.len() as u64;
        if self.log_every != 0 && frames % self.log_every == 0 {
            info!(frames, bytes, "media frames received");
        }
    }
}
