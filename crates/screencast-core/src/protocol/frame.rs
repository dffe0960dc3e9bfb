//! Length-prefixed media frame codec.
//!
//! Wire format:
//! ```text
//! [payload_len:4][payload:N]
//! ```
//! `payload_len` is a big-endian `u32`.  The payload is opaque to this crate
//! (an encoded image in a real capture pipeline).
//!
//! TCP is a stream protocol, so a single `read()` may return part of a frame
//! or several frames at once.  [`FrameDecoder`] accumulates bytes and yields
//! complete frames; [`read_frame`] is the blocking convenience for readers
//! without timeouts.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload accepted on decode (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Errors that can occur while encoding or decoding media frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The declared or supplied payload exceeds [`MAX_FRAME_LEN`].
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },

    /// The stream ended part-way through a frame.
    #[error("stream ended mid-frame: expected {expected} bytes, got {available}")]
    Truncated { expected: usize, available: usize },

    /// The underlying reader or writer failed.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Encodes `payload` into a new buffer including the 4-byte length prefix.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the payload exceeds [`MAX_FRAME_LEN`].
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    check_len(payload.len())?;
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Writes one frame to `writer`.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] for oversized payloads and
/// [`FrameError::Io`] if the write fails.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    check_len(payload.len())?;
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads one frame from a blocking reader.
///
/// Returns `Ok(None)` when the reader is at EOF on a frame boundary.
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] if EOF arrives mid-frame,
/// [`FrameError::TooLarge`] for an oversized length prefix, and
/// [`FrameError::Io`] for other read failures.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let got = read_fully(reader, &mut header)?;
    if got == 0 {
        return Ok(None);
    }
    if got < FRAME_HEADER_LEN {
        return Err(FrameError::Truncated {
            expected: FRAME_HEADER_LEN,
            available: got,
        });
    }

    let len = u32::from_be_bytes(header) as usize;
    check_len(len)?;

    let mut payload = vec![0u8; len];
    let got = read_fully(reader, &mut payload)?;
    if got < len {
        return Err(FrameError::Truncated {
            expected: len,
            available: got,
        });
    }
    Ok(Some(payload))
}

/// Incremental decoder for readers that return partial data (e.g. sockets
/// with a read timeout).
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Removes and returns the next complete frame, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] if the buffered length prefix is over
    /// the limit.  The decoder cannot resynchronise after that; the caller
    /// should drop the connection.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&self.buf[..FRAME_HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        check_len(len)?;

        let total = FRAME_HEADER_LEN + len;
        if self.buf.len() < total {
            return Ok(None);
        }
        let payload = self.buf[FRAME_HEADER_LEN..total].to_vec();
        self.buf.drain(..total);
        Ok(Some(payload))
    }
}

fn check_len(len: usize) -> Result<(), FrameError> {
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

/// Like `read_exact`, but reports how many bytes arrived before EOF instead of
/// failing with `UnexpectedEof`.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_frame_prefixes_big_endian_length() {
        // Arrange / Act
        let bytes = encode_frame(b"abc").unwrap();

        // Assert
        assert_eq!(&bytes[..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..], b"abc");
    }

    #[test]
    fn test_read_frame_returns_none_at_clean_eof() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_read_frame_reads_consecutive_frames() {
        // Arrange
        let mut wire = Vec::new();
        write_frame(&mut wire, b"first").unwrap();
        write_frame(&mut wire, b"").unwrap();
        write_frame(&mut wire, b"third").unwrap();
        let mut cursor = Cursor::new(wire);

        // Act / Assert
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), b"first");
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), b"");
        assert_eq!(read_frame(&mut cursor).unwrap().unwrap(), b"third");
        assert!(read_frame(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_read_frame_reports_truncated_payload() {
        // Arrange: header promises 10 bytes, only 4 follow
        let mut wire = vec![0, 0, 0, 10];
        wire.extend_from_slice(b"abcd");
        let mut cursor = Cursor::new(wire);

        // Act
        let result = read_frame(&mut cursor);

        // Assert
        assert!(matches!(
            result,
            Err(FrameError::Truncated {
                expected: 10,
                available: 4
            })
        ));
    }

    #[test]
    fn test_read_frame_reports_truncated_header() {
        let mut cursor = Cursor::new(vec![0u8, 0]);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(FrameError::Truncated { expected: 4, available: 2 })
        ));
    }

    #[test]
    fn test_read_frame_rejects_oversized_length_prefix() {
        let mut cursor = Cursor::new(u32::MAX.to_be_bytes().to_vec());
        assert!(matches!(
            read_frame(&mut cursor),
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_decoder_waits_for_complete_frame() {
        // Arrange
        let wire = encode_frame(b"payload").unwrap();
        let mut decoder = FrameDecoder::new();

        // Act: deliver the frame in two pieces
        decoder.push(&wire[..6]);
        let partial = decoder.next_frame().unwrap();
        decoder.push(&wire[6..]);
        let complete = decoder.next_frame().unwrap();

        // Assert
        assert!(partial.is_none());
        assert_eq!(complete.unwrap(), b"payload");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_splits_coalesced_frames() {
        // Arrange
        let mut wire = encode_frame(b"one").unwrap();
        wire.extend(encode_frame(b"two").unwrap());
        let mut decoder = FrameDecoder::new();
        decoder.push(&wire);

        // Act / Assert
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"one");
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"two");
        assert!(decoder.next_frame().unwrap().is_none());
    }
}
