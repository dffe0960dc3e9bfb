//! Network infrastructure for the admin application.
//!
//! # Sub-modules
//!
//! - **`discovery`** – Listens for UDP beacons from senders on the local
//!   network and records each source address in the [`SenderRegistry`].
//!   This is how senders are found without manual IP configuration.
//!
//! - **`control_client`** – Delivers one-shot `start` / `stop` commands to a
//!   sender's TCP control endpoint.
//!
//! [`SenderRegistry`]: crate::application::manage_senders::SenderRegistry

pub mod control_client;
pub mod discovery;
