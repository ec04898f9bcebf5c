//! Storage layer for Social Presence
//!
//! This module provides the status store abstraction. A store keeps two
//! TTL-bound records per user:
//!
//! - the *primary* record: current status, with the status' own TTL
//! - the *shadow* record: last known status, with `primary TTL + grace`
//!
//! Stores never run timers. Records simply stop being visible once their
//! TTL has elapsed; turning an expired primary into a new status is the
//! engine's job.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::types::{PresenceRecord, Status, StoreError, UserId};

/// Trait for status store implementations
///
/// Implementations are shared between arbitrarily many concurrent callers
/// and must be cheap to call through an `Arc`.
#[async_trait]
pub trait StatusStore: Send + Sync + 'static {
    /// Write the primary and shadow records for a user as one unit
    ///
    /// The primary gets `ttl`, the shadow gets `ttl + grace`. On error
    /// neither record may have changed.
    async fn write_pair(&self, user_id: &UserId, status: Status, ttl: Duration) -> Result<(), StoreError>;

    /// Read the live primary record, if any
    async fn read_primary(&self, user_id: &UserId) -> Result<Option<PresenceRecord>, StoreError>;

    /// Read the live shadow record, if any
    async fn read_shadow(&self, user_id: &UserId) -> Result<Option<Status>, StoreError>;

    /// Read many primary records in a single round trip
    ///
    /// Keys are visited in the order given. Every requested user appears
    /// in the result, mapped to `None` when its primary record is absent.
    async fn read_primary_batch(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Option<Status>>, StoreError>;

    /// Extend the primary record's TTL if it currently exists
    ///
    /// Returns `false` (not an error) when there was nothing to refresh.
    async fn refresh_ttl(&self, user_id: &UserId, ttl: Duration) -> Result<bool, StoreError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// In-memory TTL store
pub mod mem_store;

/// Redis-backed store
pub mod redis_store;

/// Backend chosen by configuration
pub mod configured;

/// Store wrappers used by tests
#[cfg(test)]
pub(crate) mod testing;

/// Re-export main storage types
pub use configured::ConfiguredStore;
pub use mem_store::MemStatusStore;
pub use redis_store::RedisStatusStore;
