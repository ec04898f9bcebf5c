//! Validated user identifiers

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::{USER_ID_MAX_LEN, USER_ID_PREFIX};
use crate::types::{PresenceError, Result};

/// Validated user identifier
///
/// Construction goes through [`UserId::parse`], so holding a `UserId`
/// means the value is non-blank, carries the `user_` prefix and is at
/// most 50 characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Validate a raw identifier
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(PresenceError::invalid_user_id("user ID cannot be empty"));
        }

        if !raw.starts_with(USER_ID_PREFIX) {
            return Err(PresenceError::invalid_user_id(format!(
                "user ID must start with '{}'",
                USER_ID_PREFIX
            )));
        }

        if raw.chars().count() > USER_ID_MAX_LEN {
            return Err(PresenceError::invalid_user_id(format!(
                "user ID too long (max {} characters)",
                USER_ID_MAX_LEN
            )));
        }

        Ok(Self(raw.to_string()))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        UserId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
