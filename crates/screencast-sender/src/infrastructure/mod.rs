//! Infrastructure layer for the sender application.
//!
//! Contains OS-facing adapters: the beacon and control sockets, the media
//! pusher, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `screencast_core`, but MUST NOT be imported by the `application` layer.

pub mod media;
pub mod network;
pub mod storage;
