//! In-memory status store using DashMap
//!
//! Both records of a user live in one map slot. A pair write replaces the
//! whole slot under the shard lock, so no reader can ever observe a primary
//! without its shadow. Expiry is passive: entries carry a deadline and
//! stop being visible once it has passed.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::constants::DEFAULT_SHADOW_GRACE;
use crate::core::config::StoreConfig;
use crate::storage::StatusStore;
use crate::types::{PresenceRecord, Status, StoreError, UserId};

/// A value with a deadline
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration, now: Instant) -> Self {
        Self { value, expires_at: now + ttl }
    }

    fn live(&self, now: Instant) -> Option<&T> {
        (now < self.expires_at).then_some(&self.value)
    }
}

/// Primary and shadow record of one user
#[derive(Debug, Clone, Default)]
struct PresenceSlot {
    primary: Option<Expiring<PresenceRecord>>,
    shadow: Option<Expiring<Status>>,
}

impl PresenceSlot {
    fn is_dead(&self, now: Instant) -> bool {
        let primary_dead = self.primary.as_ref().map_or(true, |p| p.live(now).is_none());
        let shadow_dead = self.shadow.as_ref().map_or(true, |s| s.live(now).is_none());
        primary_dead && shadow_dead
    }
}

/// In-memory implementation of [`StatusStore`]
pub struct MemStatusStore {
    /// Map of user ID to that user's record pair
    slots: DashMap<UserId, PresenceSlot>,

    /// Extra lifetime of the shadow record over the primary
    grace: Duration,

    /// Reclaim dead slots every this many writes (0 = never)
    purge_every_writes: u64,

    /// Write counter driving reclamation
    writes: AtomicU64,
}

impl MemStatusStore {
    /// Create a new store with the given shadow grace window
    pub fn new(grace: Duration, purge_every_writes: u64) -> Self {
        Self {
            slots: DashMap::new(),
            grace,
            purge_every_writes,
            writes: AtomicU64::new(0),
        }
    }

    /// Create a store from configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.shadow_grace, config.purge_every_writes)
    }

    /// Shadow grace window
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Number of users that still hold at least one slot, live or not
    pub fn tracked_users(&self) -> usize {
        self.slots.len()
    }

    /// Drop slots whose primary and shadow have both expired
    ///
    /// Only reclaims memory. A dead slot reads exactly like a missing one,
    /// so this never changes what a reader sees.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_dead(now));
        let purged = before.saturating_sub(self.slots.len());
        if purged > 0 {
            debug!(purged, "Reclaimed expired presence slots");
        }
        purged
    }

    fn note_write(&self) {
        if self.purge_every_writes == 0 {
            return;
        }
        let count = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.purge_every_writes == 0 {
            self.purge_expired();
        }
    }
}

impl Default for MemStatusStore {
    fn default() -> Self {
        Self::new(DEFAULT_SHADOW_GRACE, 4096)
    }
}

#[async_trait]
impl StatusStore for MemStatusStore {
    async fn write_pair(&self, user_id: &UserId, status: Status, ttl: Duration) -> Result<(), StoreError> {
        if !status.is_settable() {
            return Err(StoreError::rejected(format!(
                "refusing to persist status '{}'",
                status
            )));
        }

        let now = Instant::now();
        let slot = PresenceSlot {
            primary: Some(Expiring::new(PresenceRecord::new(user_id.clone(), status), ttl, now)),
            shadow: Some(Expiring::new(status, ttl + self.grace, now)),
        };
        self.slots.insert(user_id.clone(), slot);
        self.note_write();
        Ok(())
    }

    async fn read_primary(&self, user_id: &UserId) -> Result<Option<PresenceRecord>, StoreError> {
        let now = Instant::now();
        Ok(self.slots.get(user_id).and_then(|slot| {
            slot.primary
                .as_ref()
                .and_then(|p| p.live(now))
                .cloned()
        }))
    }

    async fn read_shadow(&self, user_id: &UserId) -> Result<Option<Status>, StoreError> {
        let now = Instant::now();
        Ok(self
            .slots
            .get(user_id)
            .and_then(|slot| slot.shadow.as_ref().and_then(|s| s.live(now)).copied()))
    }

    async fn read_primary_batch(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Option<Status>>, StoreError> {
        let now = Instant::now();
        let mut statuses = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            let status = self.slots.get(user_id).and_then(|slot| {
                slot.primary
                    .as_ref()
                    .and_then(|p| p.live(now))
                    .map(|record| record.status)
            });
            statuses.insert(user_id.clone(), status);
        }
        Ok(statuses)
    }

    async fn refresh_ttl(&self, user_id: &UserId, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        let Some(mut entry) = self.slots.get_mut(user_id) else {
            return Ok(false);
        };
        let PresenceSlot { primary, shadow } = &mut *entry;

        let Some(primary) = primary.as_mut().filter(|p| p.live(now).is_some()) else {
            return Ok(false);
        };
        primary.expires_at = now + ttl;

        // The shadow has to keep outliving the primary across long refresh streaks.
        let shadow_until = now + ttl + self.grace;
        let last = primary.value.status;
        match shadow {
            Some(s) => {
                s.value = last;
                s.expires_at = s.expires_at.max(shadow_until);
            }
            None => {
                *shadow = Some(Expiring { value: last, expires_at: shadow_until });
            }
        }
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
