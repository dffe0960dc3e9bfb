//! Application layer use cases for the admin console.
//!
//! Nothing here opens a socket.  Network effects go through the
//! [`control::ControlSender`] trait and the core `MediaTransport` trait, whose
//! concrete implementations live in `infrastructure`.
//!
//! # Sub-modules
//!
//! - **`manage_senders`** – The ordered registry of every sender that has
//!   announced itself, plus change notifications for the console.
//!
//! - **`control`** – The seam through which `start` / `stop` commands leave
//!   the admin, and its error type.
//!
//! - **`stream_session`** – The session state machine that keeps at most one
//!   stream running and owns its teardown.

pub mod control;
pub mod manage_senders;
pub mod stream_session;
