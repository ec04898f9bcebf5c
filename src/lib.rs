//! Social Presence - presence tracking service
//!
//! HTTP front end over the `social-presence-core` state machine. Users
//! report a status, heartbeat to stay online, and decay through `away`
//! and `offline` when they stop.
#![warn(missing_docs)]

// Core application wiring
pub mod core;

// HTTP interface
pub mod api;

// Re-export commonly used items for convenience
pub use social_presence_core::{Config, PresenceError, Result, Status};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
