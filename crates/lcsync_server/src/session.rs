//! Long-lived push and duplex sessions.

use crate::error::{ServerError, ServerResult};
use lcsync_engine::{
    CursorId, Deliver, DeliverError, DeliveryScheduler, EventStore, TransportKind,
};
use lcsync_protocol::{parse_timestamp, StreamFrame, SyncFrame};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Delivery sink backed by an unbounded frame channel.
///
/// The receiving half lives inside the session; once the session is
/// dropped, `send` fails and the scheduler closes the cursor.
struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamFrame>,
}

impl Deliver for ChannelSink {
    fn deliver(&self, frame: SyncFrame) -> Result<(), DeliverError> {
        self.tx
            .send(StreamFrame::Sync(frame))
            .map_err(|_| DeliverError("peer disconnected".into()))
    }
}

/// A server-push stream: one cursor, one outbound frame channel.
///
/// The scheduler writes a frame per non-empty tick; the embedding
/// transport reads frames with [`next_frame`](Self::next_frame) and
/// writes them to the wire. Dropping the session deregisters the cursor
/// before the next tick.
pub struct PushSession {
    id: CursorId,
    scheduler: Arc<DeliveryScheduler>,
    rx: mpsc::UnboundedReceiver<StreamFrame>,
}

impl std::fmt::Debug for PushSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSession").field("id", &self.id).finish_non_exhaustive()
    }
}

impl PushSession {
    pub(crate) fn open(
        scheduler: Arc<DeliveryScheduler>,
        store: Arc<EventStore>,
        anchor: DateTime<Utc>,
        transport: TransportKind,
    ) -> ServerResult<(CursorId, mpsc::UnboundedSender<StreamFrame>, Self)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ChannelSink { tx: tx.clone() });
        let id = scheduler.register(store, anchor, transport, sink)?;

        let session = Self {
            id,
            scheduler: Arc::clone(&scheduler),
            rx,
        };
        Ok((id, tx, session))
    }

    /// Returns the cursor id backing this session.
    pub fn id(&self) -> CursorId {
        self.id
    }

    /// Waits for the next outbound frame.
    ///
    /// Returns `None` once the server shuts down and closes the channel.
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        self.rx.recv().await
    }

    /// Returns the next outbound frame if one is already queued.
    pub fn try_next_frame(&mut self) -> Option<StreamFrame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for PushSession {
    fn drop(&mut self) {
        self.scheduler.deregister(self.id);
        debug!(cursor = self.id, "push session closed");
    }
}

/// A duplex session: a push stream plus an inbound re-anchor path.
///
/// Inbound messages are raw ISO-8601 timestamps; a malformed message is
/// answered with an error frame on the same outbound channel and the
/// session stays open.
pub struct DuplexSession {
    inner: PushSession,
    tx: mpsc::UnboundedSender<StreamFrame>,
}

impl DuplexSession {
    pub(crate) fn open(
        scheduler: Arc<DeliveryScheduler>,
        store: Arc<EventStore>,
        anchor: DateTime<Utc>,
    ) -> ServerResult<Self> {
        let (_, tx, inner) = PushSession::open(scheduler, store, anchor, TransportKind::Duplex)?;
        Ok(Self { inner, tx })
    }

    /// Returns the cursor id backing this session.
    pub fn id(&self) -> CursorId {
        self.inner.id()
    }

    /// Waits for the next outbound frame.
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        self.inner.next_frame().await
    }

    /// Returns the next outbound frame if one is already queued.
    pub fn try_next_frame(&mut self) -> Option<StreamFrame> {
        self.inner.try_next_frame()
    }

    /// Handles an inbound message: a raw ISO-8601 timestamp to re-anchor
    /// the cursor.
    ///
    /// Rejected input (unparseable, future-dated) is reported back as an
    /// error frame; only the message is discarded, never the connection.
    pub fn handle_message(&self, raw: &str) {
        let result = parse_timestamp(raw)
            .map_err(|_| ServerError::InvalidTimestamp(raw.to_string()))
            .and_then(|anchor| {
                self.inner
                    .scheduler
                    .re_anchor(self.inner.id, anchor)
                    .map_err(ServerError::from)
            });

        if let Err(error) = result {
            debug!(cursor = self.inner.id, %error, "re-anchor rejected");
            let rejected = ServerError::ReAnchorRejected(error.to_string());
            // The receiver is owned by this session, so the send only
            // fails during teardown, where the reply is moot anyway
            let _ = self.tx.send(StreamFrame::Error(rejected.to_frame()));
        }
    }
}
