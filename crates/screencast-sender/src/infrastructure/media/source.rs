//! Frame sources feeding the media pusher.
//!
//! Screen capture itself is platform work outside this crate.  The shipped
//! [`SyntheticFrameSource`] produces fixed-size numbered payloads, which is
//! enough to exercise the whole pipeline end to end.

/// Produces the next frame to push.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Vec<u8>;
}

/// Fixed-size frames whose first eight bytes are a big-endian sequence
/// number; the rest is filler derived from it.
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    size: usize,
    seq: u64,
}

impl SyntheticFrameSource {
    /// Creates a source producing `size`-byte frames (at least eight).
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(8),
            seq: 0,
        }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.size);
        frame.extend_from_slice(&self.seq.to_be_bytes());
        frame.resize(self.size, self.seq as u8);
        self.seq = self.seq.wrapping_add(1);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_have_requested_size_and_sequence() {
        // Arrange
        let mut source = SyntheticFrameSource::new(64);

        // Act
        let a = source.next_frame();
        let b = source.next_frame();

        // Assert
        assert_eq!(a.len(), 64);
        assert_eq!(&a[..8], &0u64.to_be_bytes());
        assert_eq!(&b[..8], &1u64.to_be_bytes());
    }

    #[test]
    fn test_size_is_at_least_the_sequence_header() {
        let mut source = SyntheticFrameSource::new(2);
        assert_eq!(source.next_frame().len(), 8);
    }
}
