//! Infrastructure layer for the admin application.
//!
//! Contains OS-facing adapters: the UDP discovery listener, the TCP control
//! client, the TCP media receiver, configuration storage, and the operator
//! console.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `screencast_core`, but MUST NOT be imported by the `application` layer.

pub mod console;
pub mod media;
pub mod network;
pub mod storage;
