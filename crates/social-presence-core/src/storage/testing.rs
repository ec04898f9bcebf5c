//! Recording and failure-injecting store wrapper for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::storage::{MemStatusStore, StatusStore};
use crate::types::{PresenceRecord, Status, StoreError, UserId};

/// Wraps [`MemStatusStore`], counting calls and failing on demand
pub(crate) struct RecordingStore {
    inner: MemStatusStore,
    writes: AtomicUsize,
    refreshes: AtomicUsize,
    batch_reads: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    stall: AtomicBool,
}

impl RecordingStore {
    pub(crate) fn new(grace: Duration) -> Self {
        Self {
            inner: MemStatusStore::new(grace, 0),
            writes: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            batch_reads: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            stall: AtomicBool::new(false),
        }
    }

    /// Number of committed pair writes
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of successful TTL refreshes
    pub(crate) fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Number of batch reads
    pub(crate) fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    /// Make every call hang until the caller gives up
    pub(crate) fn stall(&self, on: bool) {
        self.stall.store(on, Ordering::SeqCst);
    }

    async fn gate(&self, failing: &AtomicBool) -> Result<(), StoreError> {
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if failing.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusStore for RecordingStore {
    async fn write_pair(&self, user_id: &UserId, status: Status, ttl: Duration) -> Result<(), StoreError> {
        self.gate(&self.fail_writes).await?;
        self.inner.write_pair(user_id, status, ttl).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_primary(&self, user_id: &UserId) -> Result<Option<PresenceRecord>, StoreError> {
        self.gate(&self.fail_reads).await?;
        self.inner.read_primary(user_id).await
    }

    async fn read_shadow(&self, user_id: &UserId) -> Result<Option<Status>, StoreError> {
        self.gate(&self.fail_reads).await?;
        self.inner.read_shadow(user_id).await
    }

    async fn read_primary_batch(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Option<Status>>, StoreError> {
        self.gate(&self.fail_reads).await?;
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_primary_batch(user_ids).await
    }

    async fn refresh_ttl(&self, user_id: &UserId, ttl: Duration) -> Result<bool, StoreError> {
        self.gate(&self.fail_writes).await?;
        let refreshed = self.inner.refresh_ttl(user_id, ttl).await?;
        if refreshed {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(refreshed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.gate(&self.fail_reads).await
    }
}
