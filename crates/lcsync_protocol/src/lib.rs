//! # lcsync Protocol
//!
//! Wire types for the lcsync event synchronization server.
//!
//! This crate provides:
//! - `SyncRecord` for timestamped event records
//! - `SyncFrame` / `ErrorFrame` / `StreamFrame` for responses and streams
//! - `IngestRequest` for the ingest surface
//! - ISO-8601 timestamp parsing and formatting
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod frames;
mod record;
mod timestamp;

pub use frames::{ErrorFrame, IngestRequest, StreamFrame, SyncFrame};
pub use record::SyncRecord;
pub use timestamp::{format_timestamp, parse_timestamp, TimestampError};
