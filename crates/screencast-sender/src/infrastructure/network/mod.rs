//! Network infrastructure for the sender.
//!
//! - **`beacon`** – Periodic UDP liveness datagram toward the admin's
//!   discovery endpoint.
//! - **`control_listener`** – TCP accept loop for one-shot `start` / `stop`
//!   commands, dispatched to the stream agent.

pub mod beacon;
pub mod control_listener;
