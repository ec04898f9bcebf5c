//! Global constants used throughout the Social Presence codebase
//!
//! The TTL policy table lives here as compile-time values. It is fixed
//! and intentionally not part of the runtime configuration.

use std::time::Duration;

/// Lifetime of an `online` primary record
///
/// Clients are expected to heartbeat at least this often to stay online.
pub const ONLINE_TTL: Duration = Duration::from_secs(30);

/// Lifetime of an `away` primary record (10 minutes)
pub const AWAY_TTL: Duration = Duration::from_secs(10 * 60);

/// Lifetime of an `offline` primary record (24 hours)
pub const OFFLINE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default grace window added on top of the primary TTL for the shadow record
///
/// The shadow must outlive the primary so an expired primary can still be
/// turned into its successor status.
pub const DEFAULT_SHADOW_GRACE: Duration = Duration::from_secs(24 * 60 * 60);

/// Required prefix for every user identifier
pub const USER_ID_PREFIX: &str = "user_";

/// Maximum user identifier length in characters
pub const USER_ID_MAX_LEN: usize = 50;

