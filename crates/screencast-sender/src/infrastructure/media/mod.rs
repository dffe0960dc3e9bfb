//! Media transport for the sender.
//!
//! - **`pusher`** – [`TcpMediaPusher`], the sender's Capture/Transport
//!   implementation: connects to the admin's media endpoint and writes
//!   frames at a fixed rate.
//! - **`source`** – Where frames come from.

pub mod pusher;
pub mod source;

pub use pusher::TcpMediaPusher;
pub use source::{FrameSource, SyntheticFrameSource};
