//! Store selected at startup from configuration

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::config::{StoreBackend, StoreConfig};
use crate::storage::{MemStatusStore, RedisStatusStore, StatusStore};
use crate::types::{PresenceRecord, Status, StoreError, UserId};

/// Whichever backend `store.backend` names
pub enum ConfiguredStore {
    /// In-process store
    Memory(MemStatusStore),
    /// Redis-backed store
    Redis(RedisStatusStore),
}

impl ConfiguredStore {
    /// Build the configured backend, connecting to Redis if needed
    pub async fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::Memory(MemStatusStore::from_config(config))),
            StoreBackend::Redis => RedisStatusStore::from_config(config).await.map(Self::Redis),
        }
    }

    /// Which backend this is
    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Memory(_) => StoreBackend::Memory,
            Self::Redis(_) => StoreBackend::Redis,
        }
    }
}

#[async_trait]
impl StatusStore for ConfiguredStore {
    async fn write_pair(&self, user_id: &UserId, status: Status, ttl: Duration) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.write_pair(user_id, status, ttl).await,
            Self::Redis(store) => store.write_pair(user_id, status, ttl).await,
        }
    }

    async fn read_primary(&self, user_id: &UserId) -> Result<Option<PresenceRecord>, StoreError> {
        match self {
            Self::Memory(store) => store.read_primary(user_id).await,
            Self::Redis(store) => store.read_primary(user_id).await,
        }
    }

    async fn read_shadow(&self, user_id: &UserId) -> Result<Option<Status>, StoreError> {
        match self {
            Self::Memory(store) => store.read_shadow(user_id).await,
            Self::Redis(store) => store.read_shadow(user_id).await,
        }
    }

    async fn read_primary_batch(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, Option<Status>>, StoreError> {
        match self {
            Self::Memory(store) => store.read_primary_batch(user_ids).await,
            Self::Redis(store) => store.read_primary_batch(user_ids).await,
        }
    }

    async fn refresh_ttl(&self, user_id: &UserId, ttl: Duration) -> Result<bool, StoreError> {
        match self {
            Self::Memory(store) => store.refresh_ttl(user_id, ttl).await,
            Self::Redis(store) => store.refresh_ttl(user_id, ttl).await,
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.ping().await,
            Self::Redis(store) => store.ping().await,
        }
    }
}
