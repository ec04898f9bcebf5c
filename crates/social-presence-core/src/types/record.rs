//! Stored and reported presence records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Status, UserId};

/// Value held by a user's primary record
///
/// The TTL is owned by the store and is not part of the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// Owner of the record
    pub user_id: UserId,
    /// Current status
    pub status: Status,
    /// When the record was last written
    pub written_at: DateTime<Utc>,
}

impl PresenceRecord {
    /// Create a record stamped with the current time
    pub fn new(user_id: UserId, status: Status) -> Self {
        Self {
            user_id,
            status,
            written_at: Utc::now(),
        }
    }
}

/// Status envelope handed to callers above the core
#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    /// User the status belongs to
    pub user_id: String,
    /// Status as reported to the caller
    pub status: Status,
    /// True status, set only when `status` is a masked public view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_status: Option<Status>,
    /// When this envelope was produced
    pub timestamp: DateTime<Utc>,
    /// When the underlying primary record was written, if one was read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    /// Set when an auto-transition was computed but could not be persisted
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub transition_unsaved: bool,
}

impl StatusRecord {
    /// Envelope for a plain status
    pub fn new(user_id: impl Into<String>, status: Status) -> Self {
        Self {
            user_id: user_id.into(),
            status,
            actual_status: None,
            timestamp: Utc::now(),
            since: None,
            transition_unsaved: false,
        }
    }
}
