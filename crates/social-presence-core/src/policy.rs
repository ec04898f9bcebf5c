//! Presence policy tables
//!
//! Two fixed tables drive the state machine: how long a primary record of
//! each status lives, and what an expired primary turns into. Neither is
//! configurable at runtime.

use std::time::Duration;

use crate::constants::{AWAY_TTL, OFFLINE_TTL, ONLINE_TTL};
use crate::types::Status;

/// Primary record TTL for a status
///
/// `invisible` and `dnd` decay like `online` so a disconnected user in
/// either mode still falls back to `away` and then `offline`.
/// Returns `None` for `unknown`, which is never stored.
pub fn ttl_for(status: Status) -> Option<Duration> {
    match status {
        Status::Online | Status::Invisible | Status::Dnd => Some(ONLINE_TTL),
        Status::Away => Some(AWAY_TTL),
        Status::Offline => Some(OFFLINE_TTL),
        Status::Unknown => None,
    }
}

/// Status a user moves into once the primary record for `last` has expired
///
/// `None` means the user becomes `unknown` and nothing is written.
pub fn next_after_expiry(last: Status) -> Option<Status> {
    match last {
        Status::Online | Status::Invisible | Status::Dnd => Some(Status::Away),
        Status::Away => Some(Status::Offline),
        Status::Offline | Status::Unknown => None,
    }
}

/// Successor status and its TTL for an expired primary record
///
/// This is the write an auto-transition performs. `None` is terminal.
pub fn expiry_transition(last: Status) -> Option<(Status, Duration)> {
    next_after_expiry(last).and_then(|next| ttl_for(next).map(|ttl| (next, ttl)))
}
