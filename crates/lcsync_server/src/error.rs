//! Error types for the sync server.

use chrono::{DateTime, Utc};
use lcsync_engine::SyncError;
use lcsync_protocol::ErrorFrame;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors surfaced on the request surface.
///
/// Every variant maps to an HTTP-style status code; none of them mutate
/// state, and none of them disturb other cursors or the scheduler loop.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A timestamp parameter did not parse as an ISO date.
    #[error("lastSyncTime isn't a valid ISO date: {0:?}")]
    InvalidTimestamp(String),

    /// A timestamp parameter lies in the future.
    #[error("timestamp {supplied} is in the future")]
    FutureTimestamp {
        /// The supplied timestamp.
        supplied: DateTime<Utc>,
    },

    /// Unsupported channel (agency) key.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// No fragment partition contains the requested instant.
    #[error("no fragment contains {0}")]
    FragmentNotFound(DateTime<Utc>),

    /// The backing dataset is missing or unreadable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A duplex re-anchor message was rejected.
    #[error("re-anchor rejected: {0}")]
    ReAnchorRejected(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Returns the HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidTimestamp(_)
            | ServerError::FutureTimestamp { .. }
            | ServerError::ReAnchorRejected(_) => 400,
            ServerError::UnknownChannel(_) | ServerError::FragmentNotFound(_) => 404,
            ServerError::StoreUnavailable(_) | ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Converts to a wire error frame (duplex error reporting).
    pub fn to_frame(&self) -> ErrorFrame {
        ErrorFrame {
            error: self.to_string(),
            status: self.status_code(),
        }
    }
}

impl From<SyncError> for ServerError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::FutureAnchor { anchor, .. } => {
                ServerError::FutureTimestamp { supplied: anchor }
            }
            SyncError::StoreUnavailable(message) => ServerError::StoreUnavailable(message),
            SyncError::ReAnchorUnsupported(_) => ServerError::ReAnchorRejected(error.to_string()),
            // Disconnects are handled by deregistration, never surfaced;
            // anything else reaching here is a server-side bug
            other => ServerError::Internal(other.to_string()),
        }
    }
}
