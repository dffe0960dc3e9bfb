//! # screencast-core
//!
//! Shared library for Screencast containing the control-channel token codec,
//! the media frame codec, and the Capture/Transport abstractions that both the
//! admin console and the sender agent drive.
//!
//! This crate is used by both the admin and sender applications.
//! It opens no sockets itself; concrete transports live in the app crates.
//!
//! # Architecture overview
//!
//! Screencast lets one admin console discover screen senders on a LAN and
//! pull exactly one stream at a time:
//!
//! ```text
//!   sender                         admin
//!   ──────                         ─────
//!   beacon "hello"  ── UDP ──►     discovery registry
//!   control listener ◄── TCP ──    session manager ("start" / "stop")
//!   media pusher    ── TCP ──►     media receiver ──► frame sink
//! ```
//!
//! - **`protocol`** – The bytes on the wire: the one-token control commands,
//!   the beacon payload, and length-prefixed media frames.
//!
//! - **`transport`** – The [`MediaTransport`] / [`MediaStream`] traits, the
//!   cooperative [`StopSignal`], and the [`StreamWorker`] thread that pumps a
//!   stream until it is told to stop.
//!
//! - **`config_dir`** – Where both binaries look for their TOML files.

pub mod config_dir;
pub mod protocol;
pub mod transport;

pub use protocol::control::{ControlMessage, BEACON_PAYLOAD, MAX_COMMAND_LEN};
pub use protocol::frame::{encode_frame, read_frame, write_frame, FrameDecoder, FrameError};
pub use transport::{
    FrameSink, MediaStream, MediaTransport, StopSignal, StreamWorker, TransportError,
};
