//! Ordered, timestamp-keyed event store.

use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Utc};
use lcsync_protocol::SyncRecord;
use parking_lot::RwLock;
use std::path::Path;

/// An append-only record store ordered by timestamp.
///
/// The store maintains one invariant: records are always sorted ascending
/// by timestamp, with ties kept in insertion order. Out-of-order ingestion
/// is expected (delayed reports arrive late), so `append` finds its
/// insertion position by binary search rather than pushing at the tail.
///
/// Reads and writes go through a `RwLock`: `window` sees either the
/// complete pre-append or complete post-append state, never a partial
/// insert. The store is read far more often than written.
pub struct EventStore {
    records: RwLock<Vec<SyncRecord>>,
}

impl EventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Creates a store from existing records, sorting them if needed.
    pub fn from_records(mut records: Vec<SyncRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self {
            records: RwLock::new(records),
        }
    }

    /// Loads a store from a JSON file containing an array of records.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| SyncError::StoreUnavailable(format!("{}: {e}", path.display())))?;
        let records: Vec<SyncRecord> = serde_json::from_slice(&data)
            .map_err(|e| SyncError::StoreUnavailable(format!("{}: {e}", path.display())))?;
        Ok(Self::from_records(records))
    }

    /// Appends a record, preserving timestamp order.
    ///
    /// Duplicate ids and timestamps are accepted; dedup is the ingest
    /// collaborator's responsibility. Ties insert after existing records
    /// with the same timestamp (stable).
    pub fn append(&self, record: SyncRecord) {
        let mut records = self.records.write();
        let position = records.partition_point(|r| r.timestamp <= record.timestamp);
        records.insert(position, record);
    }

    /// Returns every record whose timestamp falls in the requested range,
    /// ascending by timestamp.
    ///
    /// An empty store yields an empty vec, never an error.
    pub fn window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        inclusive_lower: bool,
        inclusive_upper: bool,
    ) -> Vec<SyncRecord> {
        let records = self.records.read();

        let start = if inclusive_lower {
            records.partition_point(|r| r.timestamp < from)
        } else {
            records.partition_point(|r| r.timestamp <= from)
        };
        let end = if inclusive_upper {
            records.partition_point(|r| r.timestamp <= to)
        } else {
            records.partition_point(|r| r.timestamp < to)
        };

        if start >= end {
            return Vec::new();
        }
        records[start..end].to_vec()
    }

    /// Returns a snapshot of every record, ascending by timestamp.
    pub fn snapshot(&self) -> Vec<SyncRecord> {
        self.records.read().clone()
    }

    /// Returns the timestamp of the newest record, if any.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.read().last().map(|r| r.timestamp)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
