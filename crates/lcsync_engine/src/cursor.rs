//! Per-client sync cursors.

use chrono::{DateTime, Utc};

/// Identifier for a registered cursor.
pub type CursorId = u64;

/// How records are delivered to the client owning a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One request, one response; the cursor is request-scoped.
    Poll,
    /// Server-initiated stream; a frame per non-empty tick.
    Push,
    /// Push stream plus an inbound re-anchor path.
    Duplex,
}

impl TransportKind {
    /// Returns true if the scheduler drives this cursor on every tick.
    pub fn is_continuous(&self) -> bool {
        matches!(self, TransportKind::Push | TransportKind::Duplex)
    }

    /// Returns true if the anchor advances to `now` even on empty windows.
    ///
    /// Continuous transports advance unconditionally so an idle cursor
    /// never re-scans the same empty window twice. Poll only advances on
    /// delivery, so a slow poller cannot skip records appended between
    /// evaluation and response.
    pub fn advances_on_empty(&self) -> bool {
        self.is_continuous()
    }

    /// Returns true if the client can send re-anchor messages.
    pub fn accepts_re_anchor(&self) -> bool {
        matches!(self, TransportKind::Duplex)
    }
}

/// A client's position in the event timeline.
///
/// The anchor marks the last synchronized instant; every evaluation
/// returns records newer than it and moves it forward. Poll cursors live
/// for a single request; Push/Duplex cursors live until the connection
/// closes.
#[derive(Debug, Clone)]
pub struct SyncCursor {
    /// Registry identifier (0 for request-scoped poll cursors).
    pub id: CursorId,
    /// Last synchronized instant.
    pub anchor: DateTime<Utc>,
    /// Delivery transport.
    pub transport: TransportKind,
    /// False once the cursor is closed.
    pub active: bool,
}

impl SyncCursor {
    /// Creates an active cursor.
    pub fn new(id: CursorId, anchor: DateTime<Utc>, transport: TransportKind) -> Self {
        Self {
            id,
            anchor,
            transport,
            active: true,
        }
    }

    /// Creates a request-scoped poll cursor.
    pub fn ephemeral(anchor: DateTime<Utc>) -> Self {
        Self::new(0, anchor, TransportKind::Poll)
    }

    /// Moves the anchor to a new position (duplex re-anchor or delivery
    /// advance).
    pub fn re_anchor(&mut self, anchor: DateTime<Utc>) {
        self.anchor = anchor;
    }
}
