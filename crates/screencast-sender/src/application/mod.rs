//! Application layer use cases for the sender.
//!
//! - **`stream_agent`** – Owns the single outbound stream slot and reacts to
//!   `start` / `stop` commands.  The transport is injected as a
//!   `MediaTransport`, so tests run it against the recording transport.

pub mod stream_agent;
