//! # Social Presence Core
//!
//! Presence state machine for a social application. Each user's status
//! lives in a TTL-bound key-value store as a primary record plus a longer
//! lived shadow record; reads that find the primary expired advance the
//! user to the next status using the shadow.

#![warn(missing_docs)]

/// System constants
pub mod constants;

/// Type definitions for all data structures
pub mod types;

/// TTL and expiry transition tables
pub mod policy;

/// Status store abstraction and implementations
pub mod storage;

/// The presence state machine
pub mod engine;

/// Validating string-level facade
pub mod service;

/// Configuration
pub mod core;

/// System utilities and metrics
pub mod system;

// Re-export commonly used items
pub use types::{PresenceError, Result, Status, StatusRecord, StoreError, UserId};
pub use engine::{HeartbeatOutcome, PresenceEngine};
pub use service::{HeartbeatReport, PresenceService};
pub use storage::{ConfiguredStore, MemStatusStore, RedisStatusStore, StatusStore};
pub use crate::core::Config;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
