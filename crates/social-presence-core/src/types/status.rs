//! Presence status values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user's presence status
///
/// `Unknown` is synthetic: it is what a read resolves to when neither the
/// primary nor the shadow record exists. It is never written to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Actively connected and heartbeating
    Online,
    /// Connected recently but idle
    Away,
    /// Cleanly offline
    Offline,
    /// Active, but shown to other users as offline
    Invisible,
    /// Active, do not disturb
    Dnd,
    /// No record left for this user
    Unknown,
}

/// Error returned when a string is not a settable status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(pub String);

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid status '{}': must be online, away, offline, invisible, or dnd",
            self.0
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl Status {
    /// Every status a caller may set
    pub const SETTABLE: [Status; 5] = [
        Status::Online,
        Status::Away,
        Status::Offline,
        Status::Invisible,
        Status::Dnd,
    ];

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Away => "away",
            Status::Offline => "offline",
            Status::Invisible => "invisible",
            Status::Dnd => "dnd",
            Status::Unknown => "unknown",
        }
    }

    /// Whether this status may be written by a caller
    pub fn is_settable(self) -> bool {
        !matches!(self, Status::Unknown)
    }

    /// The status other users get to see
    ///
    /// Only `invisible` is masked. Everything else is reported as-is.
    pub fn public_view(self) -> Status {
        match self {
            Status::Invisible => Status::Offline,
            other => other,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseStatusError;

    /// Parses one of the five settable statuses. `unknown` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Status::Online),
            "away" => Ok(Status::Away),
            "offline" => Ok(Status::Offline),
            "invisible" => Ok(Status::Invisible),
            "dnd" => Ok(Status::Dnd),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
