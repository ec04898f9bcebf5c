//! Application State Management
//!
//! This module defines the AppState shared by all request handlers.

use std::sync::Arc;
use std::time::Instant;

use social_presence_core::{Config, PresenceService, StatusStore};

/// State shared across handlers
pub type SharedState<S> = Arc<AppState<S>>;

/// Central application state
pub struct AppState<S: StatusStore> {
    /// Presence service over the configured store
    pub service: PresenceService<S>,

    /// Application configuration
    pub config: Config,

    /// Process start, for the health endpoint
    pub started_at: Instant,
}

impl<S: StatusStore> AppState<S> {
    /// Create a new AppState
    pub fn new(service: PresenceService<S>, config: Config) -> Self {
        Self {
            service,
            config,
            started_at: Instant::now(),
        }
    }

    /// Time since the state was created, in whole seconds
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
