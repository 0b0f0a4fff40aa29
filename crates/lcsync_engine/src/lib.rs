//! # lcsync Engine
//!
//! The synchronization core of lcsync: a time-windowed event store with
//! per-client cursors and a background delivery scheduler.
//!
//! This crate provides:
//! - `EventStore` — ordered, timestamp-keyed record collection
//! - `IntervalIndex` — half-open partition lookup for the fragment read path
//! - `SyncCursor` — per-client last-seen position
//! - `WindowEvaluator` — incremental window computation
//! - `DeliveryScheduler` — tick loop fanning out to push/duplex cursors
//!
//! ## Key Invariants
//!
//! - The store is always sorted ascending by timestamp (stable on ties)
//! - Readers see complete pre-append or post-append state, never a partial
//!   insert
//! - All three transports share one evaluator; windowing semantics never
//!   diverge between them
//! - A single client's bad input never disturbs other cursors or the tick
//!   loop

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod error;
mod evaluator;
mod index;
mod scheduler;
mod store;

pub use config::SchedulerConfig;
pub use cursor::{CursorId, SyncCursor, TransportKind};
pub use error::{SyncError, SyncResult};
pub use evaluator::{Normalization, WindowEvaluation, WindowEvaluator};
pub use index::{IndexError, IntervalIndex, Partition};
pub use scheduler::{Deliver, DeliverError, DeliveryScheduler, DeliveryState};
pub use store::EventStore;
