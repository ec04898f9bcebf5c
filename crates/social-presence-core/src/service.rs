//! Presence service
//!
//! String-level entry point over [`PresenceEngine`]. Raw identifiers and
//! status names are validated here before anything reaches the store, and
//! results come back as [`StatusRecord`] envelopes ready to serialize.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::ONLINE_TTL;
use crate::engine::{HeartbeatOutcome, PresenceEngine, StatusRead};
use crate::storage::StatusStore;
use crate::types::{PresenceError, Result, Status, StatusRecord, UserId};

/// Result of a heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// What the heartbeat did
    pub outcome: HeartbeatOutcome,
    /// How long the client may wait before the next heartbeat
    pub next_heartbeat: Duration,
}

/// Validating facade over the presence engine
pub struct PresenceService<S: StatusStore> {
    engine: PresenceEngine<S>,
}

impl<S: StatusStore> Clone for PresenceService<S> {
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone() }
    }
}

impl<S: StatusStore> PresenceService<S> {
    /// Wrap an engine
    pub fn new(engine: PresenceEngine<S>) -> Self {
        Self { engine }
    }

    /// Build a service straight from a store
    pub fn with_store(store: Arc<S>, call_timeout: Duration) -> Self {
        Self::new(PresenceEngine::new(store, call_timeout))
    }

    /// The wrapped engine
    pub fn engine(&self) -> &PresenceEngine<S> {
        &self.engine
    }

    /// Set a user's status from its wire name
    pub async fn set_status(&self, user_id: &str, status: &str) -> Result<StatusRecord> {
        let id = UserId::parse(user_id)?;
        let status = status
            .parse::<Status>()
            .map_err(|e| PresenceError::invalid_status(e.to_string()))?;
        self.engine.set_status(&id, status).await?;
        Ok(StatusRecord::new(id.as_str(), status))
    }

    /// Set a user `away`
    pub async fn set_away(&self, user_id: &str) -> Result<StatusRecord> {
        self.set_known(user_id, Status::Away).await
    }

    /// Set a user `offline`
    pub async fn set_offline(&self, user_id: &str) -> Result<StatusRecord> {
        self.set_known(user_id, Status::Offline).await
    }

    /// Set a user `invisible`
    pub async fn set_invisible(&self, user_id: &str) -> Result<StatusRecord> {
        self.set_known(user_id, Status::Invisible).await
    }

    /// Set a user to do-not-disturb
    pub async fn set_dnd(&self, user_id: &str) -> Result<StatusRecord> {
        self.set_known(user_id, Status::Dnd).await
    }

    /// Read a user's true status
    pub async fn get_status(&self, user_id: &str) -> Result<StatusRecord> {
        let id = UserId::parse(user_id)?;
        let read = self.engine.get_status(&id).await?;
        Ok(envelope(&id, read.status, &read))
    }

    /// Read a user's status as other users see it
    pub async fn get_public_status(&self, user_id: &str) -> Result<StatusRecord> {
        let id = UserId::parse(user_id)?;
        let public = self.engine.get_public_status(&id).await?;
        let mut record = envelope(&id, public.shown, &public.actual);
        record.actual_status = Some(public.actual.status);
        Ok(record)
    }

    /// Read many users' true statuses at once
    ///
    /// Every ID must be valid; one bad ID fails the whole request.
    pub async fn get_multiple<I, T>(&self, user_ids: I) -> Result<HashMap<String, Status>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let ids = user_ids
            .into_iter()
            .map(|raw| UserId::parse(raw.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if ids.is_empty() {
            return Err(PresenceError::EmptyBatchRequest);
        }

        let statuses = self.engine.get_multiple(&ids).await?;
        Ok(statuses
            .into_iter()
            .map(|(id, status)| (id.as_str().to_string(), status))
            .collect())
    }

    /// Record a heartbeat
    pub async fn heartbeat(&self, user_id: &str) -> Result<HeartbeatReport> {
        let id = UserId::parse(user_id)?;
        let outcome = self.engine.heartbeat(&id).await?;
        Ok(HeartbeatReport {
            outcome,
            next_heartbeat: ONLINE_TTL,
        })
    }

    /// Check the store behind the engine
    pub async fn ping(&self) -> Result<()> {
        self.engine.ping().await
    }

    async fn set_known(&self, user_id: &str, status: Status) -> Result<StatusRecord> {
        let id = UserId::parse(user_id)?;
        self.engine.set_status(&id, status).await?;
        Ok(StatusRecord::new(id.as_str(), status))
    }
}

fn envelope(id: &UserId, shown: Status, read: &StatusRead) -> StatusRecord {
    let mut record = StatusRecord::new(id.as_str(), shown);
    record.since = read.since;
    record.transition_unsaved = !read.is_persisted();
    record
}
