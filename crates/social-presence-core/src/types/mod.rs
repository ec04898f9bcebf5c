//! Type definitions for the Social Presence system
//!
//! This module contains all type definitions organized by category.

/// Presence status enumeration
pub mod status;
/// Validated user identifiers
pub mod user;
/// Stored and reported records
pub mod record;
/// System-wide error types
pub mod error;

// Re-export commonly used types for convenience
pub use status::{Status, ParseStatusError};
pub use user::UserId;
pub use record::{PresenceRecord, StatusRecord};
pub use error::{PresenceError, StoreError, Result};
