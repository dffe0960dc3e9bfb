//! screencast-sender library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the sender do? (for beginners)
//!
//! The *sender* is a machine offering its screen.  It never decides on its
//! own to stream; the admin tells it to.
//!
//! 1. Every few seconds it fires a UDP beacon at the admin so the admin
//!    knows it exists.
//! 2. It listens on a TCP control port for one-word commands: `start` and
//!    `stop`.
//! 3. On `start` it connects to the admin's media endpoint and pushes
//!    length-prefixed frames until told to `stop`.

/// Application layer: the stream agent use case.
pub mod application;

/// Infrastructure layer: sockets, media source, and config storage.
pub mod infrastructure;
