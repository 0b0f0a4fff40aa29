//! Incremental window evaluation.

use crate::cursor::SyncCursor;
use crate::error::{SyncError, SyncResult};
use crate::store::EventStore;
use chrono::{DateTime, NaiveDate, Utc};
use lcsync_protocol::SyncRecord;

/// Timestamp comparison strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Compare timestamps as-is.
    #[default]
    None,
    /// Compare time-of-day only, mapped onto the current calendar date.
    ///
    /// Lets a frozen historical dataset behave as a live feed: a record
    /// stamped 10:00 on any date matches a window crossing 10:00 today.
    /// Returned records keep their original timestamps.
    TimeOfDay,
}

/// Result of one window evaluation.
#[derive(Debug, Clone)]
pub struct WindowEvaluation {
    /// Matching records, ascending by timestamp.
    pub records: Vec<SyncRecord>,
    /// Where the cursor should point next.
    pub new_anchor: DateTime<Utc>,
}

/// Computes incremental windows over an [`EventStore`].
///
/// Shared by all three transports; the only per-transport difference is
/// the anchor policy. Continuous transports (Push/Duplex) advance to
/// `now` on every evaluation, empty or not, so skipped ticks never pile
/// up. Poll advances to the last delivered record, or stays put when the
/// window is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowEvaluator {
    normalization: Normalization,
}

impl WindowEvaluator {
    /// Creates an evaluator with the given normalization strategy.
    pub fn new(normalization: Normalization) -> Self {
        Self { normalization }
    }

    /// Returns the normalization strategy.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Evaluates the window `[cursor.anchor, now]` against the store.
    ///
    /// Rejects a future anchor with [`SyncError::FutureAnchor`]; the
    /// evaluator never panics on bad input.
    pub fn evaluate(&self, store: &EventStore, cursor: &SyncCursor) -> SyncResult<WindowEvaluation> {
        self.evaluate_at(store, cursor, Utc::now())
    }

    /// Like [`evaluate`](Self::evaluate) with an explicit `now`, for
    /// deterministic callers and tests.
    pub fn evaluate_at(
        &self,
        store: &EventStore,
        cursor: &SyncCursor,
        now: DateTime<Utc>,
    ) -> SyncResult<WindowEvaluation> {
        if cursor.anchor > now {
            return Err(SyncError::FutureAnchor {
                anchor: cursor.anchor,
                now,
            });
        }

        let records = match self.normalization {
            Normalization::None => store.window(cursor.anchor, now, true, true),
            Normalization::TimeOfDay => {
                Self::time_of_day_window(store, cursor.anchor, now, now.date_naive())
            }
        };

        let new_anchor = if cursor.transport.advances_on_empty() {
            now
        } else {
            records.last().map(|r| r.timestamp).unwrap_or(cursor.anchor)
        };

        Ok(WindowEvaluation {
            records,
            new_anchor,
        })
    }

    /// Filters by time-of-day: both the anchor and every candidate are
    /// mapped onto `today` before comparing. Original timestamps are kept
    /// in the output.
    fn time_of_day_window(
        store: &EventStore,
        anchor: DateTime<Utc>,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Vec<SyncRecord> {
        let normalized_anchor = onto_date(anchor, today);

        let mut records: Vec<SyncRecord> = store
            .snapshot()
            .into_iter()
            .filter(|r| {
                let normalized = onto_date(r.timestamp, today);
                normalized_anchor <= normalized && normalized <= now
            })
            .collect();
        // The store is ordered by full timestamp; re-order by wall-clock
        // time so the frame stays ascending under normalization.
        records.sort_by_key(|r| r.timestamp.time());
        records
    }
}

/// Keeps the time of day, replaces the calendar date.
fn onto_date(instant: DateTime<Utc>, date: NaiveDate) -> DateTime<Utc> {
    date.and_time(instant.time()).and_utc()
}
