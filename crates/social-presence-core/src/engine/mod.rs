//! Presence Engine
//!
//! The engine owns the presence state machine: which TTL a status gets,
//! what an expired primary record turns into, and when a heartbeat may
//! refresh or re-promote a user. All state lives in the store; the engine
//! itself holds nothing mutable, so it can be shared freely.
//!
//! Transitions are lazy. Nothing happens when a record expires. The next
//! single-user read that misses the primary derives the successor status
//! from the shadow record and writes it back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::ONLINE_TTL;
use crate::policy;
use crate::storage::StatusStore;
use crate::system::metrics::{Metrics, Timer};
use crate::types::{PresenceError, PresenceRecord, Result, Status, StoreError, UserId};

/// A transition computed by a read that found the primary record missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoTransition {
    /// Last known status, taken from the shadow record
    pub from: Status,
    /// Status the user moved into
    pub to: Status,
    /// Set when the derived pair could not be written back
    pub persist_error: Option<StoreError>,
}

impl AutoTransition {
    /// Whether the derived status made it into the store
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Result of a single-user status read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRead {
    /// The user's true status
    pub status: Status,
    /// When the primary record was written, if one was found
    pub since: Option<DateTime<Utc>>,
    /// Present when this read advanced the user's status
    pub transition: Option<AutoTransition>,
}

impl StatusRead {
    fn current(record: PresenceRecord) -> Self {
        Self {
            status: record.status,
            since: Some(record.written_at),
            transition: None,
        }
    }

    fn unknown() -> Self {
        Self {
            status: Status::Unknown,
            since: None,
            transition: None,
        }
    }

    /// False only when a transition was computed but not persisted
    pub fn is_persisted(&self) -> bool {
        self.transition.as_ref().map_or(true, AutoTransition::is_persisted)
    }
}

/// Status as shown to other users, alongside the true read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicStatus {
    /// Presentation value (`invisible` shown as `offline`)
    pub shown: Status,
    /// The unmasked read
    pub actual: StatusRead,
}

/// What a heartbeat did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// `away` was promoted back to `online`
    Promoted,
    /// `online` had its TTL extended
    Refreshed,
    /// `online` lapsed between the read and the refresh; nothing changed
    Lapsed,
    /// Any other status; heartbeats never resurrect or unmask a user
    Ignored(Status),
}

impl HeartbeatOutcome {
    /// Metric label for the outcome
    pub fn label(&self) -> &'static str {
        match self {
            HeartbeatOutcome::Promoted => "promoted",
            HeartbeatOutcome::Refreshed => "refreshed",
            HeartbeatOutcome::Lapsed => "lapsed",
            HeartbeatOutcome::Ignored(_) => "ignored",
        }
    }
}

/// The presence state machine over a status store
///
/// The store handle is passed in explicitly so tests can swap in a fake.
pub struct PresenceEngine<S: StatusStore> {
    store: Arc<S>,
    call_timeout: Duration,
}

impl<S: StatusStore> Clone for PresenceEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            call_timeout: self.call_timeout,
        }
    }
}

impl<S: StatusStore> PresenceEngine<S> {
    /// Create an engine over a shared store
    ///
    /// Every store call is bounded by `call_timeout`; running out of time
    /// is reported as `StoreUnavailable`.
    pub fn new(store: Arc<S>, call_timeout: Duration) -> Self {
        Self { store, call_timeout }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Set a user's status, writing the primary and shadow records together
    pub async fn set_status(&self, user_id: &UserId, status: Status) -> Result<()> {
        let ttl = policy::ttl_for(status).ok_or_else(|| {
            PresenceError::invalid_status(format!("'{}' cannot be set", status))
        })?;
        self.write(user_id, status, ttl).await?;
        debug!(user_id = %user_id, status = %status, "Status set");
        Ok(())
    }

    /// Set a user `away`
    pub async fn set_away(&self, user_id: &UserId) -> Result<()> {
        self.set_status(user_id, Status::Away).await
    }

    /// Set a user `offline`
    pub async fn set_offline(&self, user_id: &UserId) -> Result<()> {
        self.set_status(user_id, Status::Offline).await
    }

    /// Set a user `invisible`
    pub async fn set_invisible(&self, user_id: &UserId) -> Result<()> {
        self.set_status(user_id, Status::Invisible).await
    }

    /// Set a user to do-not-disturb
    pub async fn set_dnd(&self, user_id: &UserId) -> Result<()> {
        self.set_status(user_id, Status::Dnd).await
    }

    /// Read a user's status, advancing it if the primary record has expired
    ///
    /// A miss on the primary consults the shadow record. If the shadow
    /// names a status with a successor, the successor is written back with
    /// its own TTL and returned. A failed write-back does not fail the
    /// read: the derived status is still returned and the failure is
    /// reported through [`StatusRead::transition`].
    pub async fn get_status(&self, user_id: &UserId) -> Result<StatusRead> {
        if let Some(record) = self.call("read_primary", self.store.read_primary(user_id)).await? {
            return Ok(StatusRead::current(record));
        }

        let Some(last) = self.call("read_shadow", self.store.read_shadow(user_id)).await? else {
            return Ok(StatusRead::unknown());
        };

        let Some((next, ttl)) = policy::expiry_transition(last) else {
            debug!(user_id = %user_id, last = %last, "Presence lapsed to unknown");
            return Ok(StatusRead::unknown());
        };

        let metrics = Metrics::global();
        metrics
            .auto_transitions
            .with_label_values(&[last.as_str(), next.as_str()])
            .inc();

        let persist_error = match self.write(user_id, next, ttl).await {
            Ok(()) => {
                debug!(user_id = %user_id, from = %last, to = %next, "Auto-transition persisted");
                None
            }
            Err(e) => {
                metrics.transition_write_failures.inc();
                warn!(
                    user_id = %user_id,
                    from = %last,
                    to = %next,
                    error = %e,
                    "Auto-transition computed but not persisted"
                );
                Some(e)
            }
        };

        Ok(StatusRead {
            status: next,
            since: None,
            transition: Some(AutoTransition { from: last, to: next, persist_error }),
        })
    }

    /// Read a user's status as other users should see it
    pub async fn get_public_status(&self, user_id: &UserId) -> Result<PublicStatus> {
        let actual = self.get_status(user_id).await?;
        Ok(PublicStatus {
            shown: actual.status.public_view(),
            actual,
        })
    }

    /// Read many users' statuses in one store round trip
    ///
    /// Unlike [`get_status`](Self::get_status) this never advances anyone:
    /// a missing primary is reported as `unknown` even when the shadow
    /// would have produced a transition. Bulk reads trade freshness for a
    /// single round trip.
    pub async fn get_multiple(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, Status>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let batch = self
            .call("read_primary_batch", self.store.read_primary_batch(user_ids))
            .await?;

        Ok(user_ids
            .iter()
            .map(|id| {
                let status = batch.get(id).copied().flatten().unwrap_or(Status::Unknown);
                (id.clone(), status)
            })
            .collect())
    }

    /// Record a heartbeat from a user
    ///
    /// `away` is promoted back to `online`, `online` gets a fresh TTL, and
    /// every other status is left alone.
    pub async fn heartbeat(&self, user_id: &UserId) -> Result<HeartbeatOutcome> {
        let read = self.get_status(user_id).await?;

        let outcome = match read.status {
            Status::Away => {
                self.write(user_id, Status::Online, ONLINE_TTL).await?;
                HeartbeatOutcome::Promoted
            }
            Status::Online => {
                let refreshed = self
                    .call("refresh_ttl", self.store.refresh_ttl(user_id, ONLINE_TTL))
                    .await?;
                if refreshed {
                    HeartbeatOutcome::Refreshed
                } else {
                    HeartbeatOutcome::Lapsed
                }
            }
            other => HeartbeatOutcome::Ignored(other),
        };

        Metrics::global()
            .heartbeats
            .with_label_values(&[outcome.label()])
            .inc();
        debug!(user_id = %user_id, outcome = outcome.label(), "Heartbeat handled");
        Ok(outcome)
    }

    /// Check that the store answers
    pub async fn ping(&self) -> Result<()> {
        self.call("ping", self.store.ping()).await?;
        Ok(())
    }

    async fn write(&self, user_id: &UserId, status: Status, ttl: Duration) -> std::result::Result<(), StoreError> {
        self.call("write_pair", self.store.write_pair(user_id, status, ttl))
            .await?;
        Metrics::global()
            .status_writes
            .with_label_values(&[status.as_str()])
            .inc();
        Ok(())
    }

    /// Run one store call under the call timeout
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> std::result::Result<T, StoreError>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        let metrics = Metrics::global();
        let timer = Timer::start(&metrics.store_call_duration);
        let result = match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        };
        timer.finish();

        if let Err(e) = &result {
            metrics.store_errors.with_label_values(&[operation]).inc();
            warn!(operation, error = %e, "Status store call failed");
        }
        result
    }
}

#[cfg(test)]
mod tests;
