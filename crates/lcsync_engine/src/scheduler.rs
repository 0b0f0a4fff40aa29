//! Background delivery scheduling for push and duplex cursors.

use crate::config::SchedulerConfig;
use crate::cursor::{CursorId, SyncCursor, TransportKind};
use crate::error::{SyncError, SyncResult};
use crate::evaluator::{WindowEvaluation, WindowEvaluator};
use crate::store::EventStore;
use chrono::{DateTime, Utc};
use lcsync_protocol::SyncFrame;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Error returned by a delivery sink when the peer is gone.
#[derive(thiserror::Error, Debug)]
#[error("delivery failed: {0}")]
pub struct DeliverError(pub String);

/// Outbound side of a transport connection.
///
/// One implementation per transport; the scheduler stays ignorant of how
/// frames reach the wire. Returning an error means the peer is gone and
/// the cursor will be closed — sinks must not block.
pub trait Deliver: Send + Sync {
    /// Hands a frame to the transport.
    fn deliver(&self, frame: SyncFrame) -> Result<(), DeliverError>;
}

/// Delivery state of a registered cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Waiting for the next tick.
    Idle,
    /// Window evaluation in progress.
    Evaluating,
    /// Last tick delivered a frame.
    Delivered,
    /// Last tick found an empty window (nothing sent).
    Empty,
    /// Cursor closed by disconnect or shutdown; terminal.
    Closed,
}

impl DeliveryState {
    /// Returns true if the cursor has reached its terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryState::Closed)
    }
}

/// A cursor registered with the scheduler, bound to its store and sink.
struct Registration {
    cursor: SyncCursor,
    store: Arc<EventStore>,
    sink: Arc<dyn Deliver>,
    state: DeliveryState,
}

/// Drives every push/duplex cursor from a single periodic tick.
///
/// On each tick the scheduler evaluates the window for every active
/// cursor and fans non-empty results out through the cursor's
/// [`Deliver`] sink. Empty windows cost one evaluation and zero bytes.
/// A sink failure closes that cursor; it never stalls the loop or other
/// cursors.
///
/// Cursors may be registered and deregistered while a tick is running:
/// the tick iterates a snapshot of cursor ids and applies removals when
/// the pass completes.
///
/// Poll requests do not register anything; they go through
/// [`poll`](Self::poll) with a request-scoped cursor.
pub struct DeliveryScheduler {
    config: SchedulerConfig,
    evaluator: WindowEvaluator,
    cursors: RwLock<HashMap<CursorId, Registration>>,
    next_id: AtomicU64,
}

impl DeliveryScheduler {
    /// Creates a scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        let evaluator = WindowEvaluator::new(config.normalization);
        Self {
            config,
            evaluator,
            cursors: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the scheduler's configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns the shared evaluator.
    pub fn evaluator(&self) -> &WindowEvaluator {
        &self.evaluator
    }

    /// Evaluates one on-demand window for a poll request.
    ///
    /// Nothing is retained; the caller resumes by sending the returned
    /// anchor on its next request.
    pub fn poll(
        &self,
        store: &EventStore,
        anchor: DateTime<Utc>,
    ) -> SyncResult<WindowEvaluation> {
        let cursor = SyncCursor::ephemeral(anchor);
        self.evaluator.evaluate(store, &cursor)
    }

    /// Registers a long-lived push or duplex cursor.
    ///
    /// Rejects anchors in the future. The cursor is evaluated on every
    /// tick until it is deregistered or its sink reports a dead peer.
    pub fn register(
        &self,
        store: Arc<EventStore>,
        anchor: DateTime<Utc>,
        transport: TransportKind,
        sink: Arc<dyn Deliver>,
    ) -> SyncResult<CursorId> {
        let now = Utc::now();
        if anchor > now {
            return Err(SyncError::FutureAnchor { anchor, now });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let registration = Registration {
            cursor: SyncCursor::new(id, anchor, transport),
            store,
            sink,
            state: DeliveryState::Idle,
        };
        self.cursors.write().insert(id, registration);
        debug!(cursor = id, ?transport, "cursor registered");
        Ok(id)
    }

    /// Deregisters a cursor; takes effect before the next tick.
    pub fn deregister(&self, id: CursorId) {
        if let Some(mut registration) = self.cursors.write().remove(&id) {
            registration.cursor.active = false;
            registration.state = DeliveryState::Closed;
            debug!(cursor = id, "cursor deregistered");
        }
    }

    /// Overwrites a duplex cursor's anchor; evaluation restarts from the
    /// new point on the next tick, regardless of delivery state.
    pub fn re_anchor(&self, id: CursorId, anchor: DateTime<Utc>) -> SyncResult<()> {
        let now = Utc::now();
        if anchor > now {
            return Err(SyncError::FutureAnchor { anchor, now });
        }

        let mut cursors = self.cursors.write();
        let registration = cursors.get_mut(&id).ok_or(SyncError::UnknownCursor(id))?;
        if !registration.cursor.transport.accepts_re_anchor() {
            return Err(SyncError::ReAnchorUnsupported(
                registration.cursor.transport,
            ));
        }
        if !registration.cursor.active {
            return Err(SyncError::CursorClosed(id));
        }

        registration.cursor.re_anchor(anchor);
        debug!(cursor = id, %anchor, "cursor re-anchored");
        Ok(())
    }

    /// Runs one scheduling pass over every active cursor.
    pub fn tick(&self) {
        let ids: Vec<CursorId> = self.cursors.read().keys().copied().collect();
        let mut dead = Vec::new();

        for id in ids {
            // The registration may have been deregistered mid-pass
            let (cursor, store, sink) = {
                let mut cursors = self.cursors.write();
                let Some(registration) = cursors.get_mut(&id) else {
                    continue;
                };
                if !registration.cursor.active {
                    continue;
                }
                registration.state = DeliveryState::Evaluating;
                (
                    registration.cursor.clone(),
                    Arc::clone(&registration.store),
                    Arc::clone(&registration.sink),
                )
            };

            let evaluation = match self.evaluator.evaluate(&store, &cursor) {
                Ok(evaluation) => evaluation,
                Err(e) => {
                    // Local to this cursor; the loop and its peers carry on
                    warn!(cursor = id, error = %e, "window evaluation failed");
                    self.set_state(id, DeliveryState::Idle);
                    continue;
                }
            };

            let outcome = if evaluation.records.is_empty() {
                DeliveryState::Empty
            } else {
                let count = evaluation.records.len();
                let frame = SyncFrame::new(evaluation.new_anchor, evaluation.records.clone());
                match sink.deliver(frame) {
                    Ok(()) => {
                        debug!(cursor = id, records = count, "frame delivered");
                        DeliveryState::Delivered
                    }
                    Err(e) => {
                        warn!(cursor = id, error = %e, "peer gone, closing cursor");
                        dead.push(id);
                        continue;
                    }
                }
            };

            let mut cursors = self.cursors.write();
            if let Some(registration) = cursors.get_mut(&id) {
                // A mid-pass re-anchor wins over the tick's advance
                if registration.cursor.anchor == cursor.anchor {
                    registration.cursor.re_anchor(evaluation.new_anchor);
                }
                registration.state = outcome;
            }
        }

        // Removals are applied after the pass, never during iteration
        for id in dead {
            self.deregister(id);
        }
    }

    /// Runs the tick loop until the shutdown signal fires.
    ///
    /// The in-flight tick finishes before the loop exits; every cursor is
    /// then closed and its sink dropped, so no further deliveries occur.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.config.tick_interval, "delivery scheduler started");

        loop {
            tokio::select! {
                _ = tick.tick() => self.tick(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.close_all();
        info!("delivery scheduler stopped");
    }

    /// Closes every cursor and drops its sink.
    pub fn close_all(&self) {
        let mut cursors = self.cursors.write();
        for (_, registration) in cursors.iter_mut() {
            registration.cursor.active = false;
            registration.state = DeliveryState::Closed;
        }
        let closed = cursors.len();
        cursors.clear();
        if closed > 0 {
            info!(cursors = closed, "closed all cursors");
        }
    }

    /// Returns the number of registered cursors.
    pub fn active_count(&self) -> usize {
        self.cursors.read().len()
    }

    /// Returns true if the cursor is still registered.
    pub fn is_registered(&self, id: CursorId) -> bool {
        self.cursors.read().contains_key(&id)
    }

    /// Returns the cursor's current anchor, if registered.
    pub fn anchor_of(&self, id: CursorId) -> Option<DateTime<Utc>> {
        self.cursors.read().get(&id).map(|r| r.cursor.anchor)
    }

    /// Returns the cursor's delivery state, if registered.
    pub fn state_of(&self, id: CursorId) -> Option<DeliveryState> {
        self.cursors.read().get(&id).map(|r| r.state)
    }

    fn set_state(&self, id: CursorId, state: DeliveryState) {
        if let Some(registration) = self.cursors.write().get_mut(&id) {
            registration.state = state;
        }
    }
}
