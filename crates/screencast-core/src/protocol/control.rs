//! Control-channel command tokens.
//!
//! Wire contract:
//! ```text
//! admin ──connect──► sender:control_port
//! admin ──"start" or "stop"──► (then half-close)
//! ```
//!
//! One command per connection, no length prefix, no acknowledgement frame.
//! The receiver reads until EOF (bounded by [`MAX_COMMAND_LEN`]) and parses
//! the whole buffer as a single token.

use std::fmt;

/// Upper bound on the bytes a control listener reads from one connection.
pub const MAX_COMMAND_LEN: usize = 1024;

/// Liveness marker each sender broadcasts to the admin's discovery endpoint.
///
/// Only the arrival of a datagram matters; the content is informational.
pub const BEACON_PAYLOAD: &[u8] = b"hello";

/// A command carried over the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMessage {
    /// Begin pushing media toward the admin.
    Start,
    /// Halt the outbound media stream.
    Stop,
}

impl ControlMessage {
    /// Returns the literal token written on the wire.
    pub fn as_token(self) -> &'static str {
        match self {
            ControlMessage::Start => "start",
            ControlMessage::Stop => "stop",
        }
    }

    /// Returns the wire bytes for this command.
    pub fn to_bytes(self) -> &'static [u8] {
        self.as_token().as_bytes()
    }

    /// Parses a received command buffer.
    ///
    /// Surrounding ASCII whitespace is ignored so that a trailing newline from
    /// a line-oriented tool still parses.  Returns `None` for anything that is
    /// not exactly one known token; callers treat that as a no-op.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes.trim_ascii() {
            b"start" => Some(ControlMessage::Start),
            b"stop" => Some(ControlMessage::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}
