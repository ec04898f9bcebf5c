//! Error types and handling for Social Presence
//!
//! Every error is reported synchronously to the caller. Nothing in this
//! crate retries; retry policy belongs to whoever called in.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, PresenceError>;

/// Main error type for presence operations
#[derive(Error, Debug)]
pub enum PresenceError {
    /// The user identifier failed validation
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// The status is not one of the settable values
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The backing store could not be reached or did not answer in time
    #[error("Store unavailable: {0}")]
    StoreUnavailable(StoreError),

    /// A bulk read was requested with no user IDs
    #[error("User IDs cannot be empty")]
    EmptyBatchRequest,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Status store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection failed, lost, or the write could not be committed
    #[error("{0}")]
    Unavailable(String),

    /// The store did not answer within the call timeout
    #[error("operation timed out")]
    Timeout,

    /// The store refused the value itself; retrying cannot help
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<StoreError> for PresenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(msg) => PresenceError::InvalidStatus(msg),
            other => PresenceError::StoreUnavailable(other),
        }
    }
}

impl PresenceError {
    /// Create an invalid user ID error
    pub fn invalid_user_id(msg: impl Into<String>) -> Self {
        Self::InvalidUserId(msg.into())
    }

    /// Create an invalid status error
    pub fn invalid_status(msg: impl Into<String>) -> Self {
        Self::InvalidStatus(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if the caller may reasonably retry this request
    pub fn is_retryable(&self) -> bool {
        matches!(self, PresenceError::StoreUnavailable(_))
    }

    /// Check if this is a client error (4xx equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PresenceError::InvalidUserId(_)
                | PresenceError::InvalidStatus(_)
                | PresenceError::EmptyBatchRequest
        )
    }
}

impl StoreError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a rejected-value error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}
