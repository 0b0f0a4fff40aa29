//! Error types for the sync engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A cursor anchor lies in the future (clock skew or bad input).
    #[error("anchor {anchor} is after now ({now})")]
    FutureAnchor {
        /// The supplied anchor.
        anchor: DateTime<Utc>,
        /// The evaluation instant it was compared against.
        now: DateTime<Utc>,
    },

    /// The backing dataset could not be read.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The remote peer went away during delivery.
    #[error("peer disconnected")]
    PeerDisconnected,

    /// No cursor registered under the given id.
    #[error("unknown cursor {0}")]
    UnknownCursor(u64),

    /// The cursor has already been closed.
    #[error("cursor {0} is closed")]
    CursorClosed(u64),

    /// Re-anchor sent to a cursor whose transport has no inbound path.
    #[error("transport {0:?} does not accept re-anchor messages")]
    ReAnchorUnsupported(crate::cursor::TransportKind),
}

impl SyncError {
    /// Returns true if the error is the caller's fault (bad input).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SyncError::FutureAnchor { .. } | SyncError::ReAnchorUnsupported(_)
        )
    }
}
