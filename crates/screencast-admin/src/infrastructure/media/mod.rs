//! Media transport for the admin application.
//!
//! - **`receiver`** – [`TcpMediaReceiver`], the admin's Capture/Transport
//!   implementation: binds the media endpoint and reads frames pushed by the
//!   streaming sender.
//! - **`sink`** – [`LoggingFrameSink`], the presentation stand-in that counts
//!   what arrives.

pub mod receiver;
pub mod sink;

pub use receiver::TcpMediaReceiver;
pub use sink::LoggingFrameSink;
