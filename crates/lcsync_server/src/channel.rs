//! Per-channel dataset state.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use lcsync_engine::{EventStore, IntervalIndex};
use std::sync::Arc;
use tracing::info;

/// One channel's (agency's) datasets: the event store and the fragment
/// partition index.
///
/// Loaded once at startup; the index stays read-only for the process
/// lifetime while the store keeps accepting ingested records.
pub struct ChannelState {
    /// Channel key, e.g. `"sncb"`.
    pub name: String,
    /// Timestamp-ordered event records.
    pub store: Arc<EventStore>,
    /// Fragment partition boundaries.
    pub index: Arc<IntervalIndex>,
}

impl ChannelState {
    /// Creates an empty in-memory channel (tests, embedding).
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(EventStore::new()),
            index: Arc::new(IntervalIndex::empty()),
        }
    }

    /// Creates a channel around existing state.
    pub fn new(name: impl Into<String>, store: Arc<EventStore>, index: Arc<IntervalIndex>) -> Self {
        Self {
            name: name.into(),
            store,
            index,
        }
    }

    /// Loads a channel's datasets from disk per the config layout.
    pub fn load(name: &str, config: &ServerConfig) -> ServerResult<Self> {
        let events_file = config.events_file(name);
        let store = EventStore::load(&events_file).map_err(ServerError::from)?;

        let connections_dir = config.connections_dir(name);
        let index = IntervalIndex::from_directory(&connections_dir)
            .map_err(|e| ServerError::StoreUnavailable(e.to_string()))?;

        info!(
            channel = name,
            records = store.len(),
            partitions = index.len(),
            "channel loaded"
        );

        Ok(Self::new(name, Arc::new(store), Arc::new(index)))
    }
}
