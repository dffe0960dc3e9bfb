//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads `admin.toml` from the platform config
//! directory and falls back to defaults when the file does not exist yet.

pub mod config;
