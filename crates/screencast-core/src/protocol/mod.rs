//! Protocol module containing the control tokens, the beacon payload, and the
//! media frame codec.

pub mod control;
pub mod frame;

pub use control::{ControlMessage, BEACON_PAYLOAD, MAX_COMMAND_LEN};
pub use frame::{encode_frame, read_frame, write_frame, FrameDecoder, FrameError, MAX_FRAME_LEN};

/// Default TCP port the admin receives media frames on.
pub const DEFAULT_MEDIA_PORT: u16 = 9999;
/// Default UDP port the admin listens for beacons on.
pub const DEFAULT_DISCOVERY_PORT: u16 = 8888;
/// Default TCP port each sender accepts control commands on.
pub const DEFAULT_CONTROL_PORT: u16 = 7777;
