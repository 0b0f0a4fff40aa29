//! Request handlers for the sync endpoints.

use crate::channel::ChannelState;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use lcsync_engine::{DeliveryScheduler, Partition, SchedulerConfig};
use lcsync_protocol::{parse_timestamp, IngestRequest, SyncFrame, SyncRecord};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Context shared by every request handler.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Channels keyed by agency name.
    channels: HashMap<String, Arc<ChannelState>>,
    /// The shared delivery scheduler.
    pub scheduler: Arc<DeliveryScheduler>,
}

impl HandlerContext {
    /// Creates a context from already-built channels.
    pub fn new(config: ServerConfig, channels: Vec<ChannelState>) -> Self {
        let scheduler = Arc::new(DeliveryScheduler::new(
            SchedulerConfig::new(config.tick_interval).with_normalization(config.normalization),
        ));
        let channels = channels
            .into_iter()
            .map(|c| (c.name.clone(), Arc::new(c)))
            .collect();
        Self {
            config,
            channels,
            scheduler,
        }
    }

    /// Looks a channel up by key.
    pub fn channel(&self, name: &str) -> ServerResult<&Arc<ChannelState>> {
        self.channels
            .get(name)
            .ok_or_else(|| ServerError::UnknownChannel(name.to_string()))
    }

    /// Returns every channel key.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }
}

/// Handles the stateless request surface: poll, ingest, fragment lookup.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a handler over the shared context.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles `GET /{channel}/events/poll?lastSyncTime=...`.
    ///
    /// The cursor lives for this one request; the client resumes by
    /// sending the returned `lastSyncTime` next time.
    pub fn handle_poll(&self, channel: &str, last_sync_time: &str) -> ServerResult<SyncFrame> {
        let channel = self.context.channel(channel)?;
        let anchor = parse_timestamp(last_sync_time)
            .map_err(|_| ServerError::InvalidTimestamp(last_sync_time.to_string()))?;

        let evaluation = self.context.scheduler.poll(&channel.store, anchor)?;
        debug!(
            channel = %channel.name,
            records = evaluation.records.len(),
            "poll served"
        );
        Ok(SyncFrame::new(evaluation.new_anchor, evaluation.records))
    }

    /// Handles `POST /{channel}/events` (the ingest collaborator surface).
    pub fn handle_ingest(&self, channel: &str, request: IngestRequest) -> ServerResult<()> {
        let channel = self.context.channel(channel)?;
        let timestamp = parse_timestamp(&request.timestamp)
            .map_err(|_| ServerError::InvalidTimestamp(request.timestamp.clone()))?;

        let payload = match request.payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other);
                map
            }
        };

        channel
            .store
            .append(SyncRecord::with_payload(request.record_id, timestamp, payload));
        debug!(channel = %channel.name, "record ingested");
        Ok(())
    }

    /// Handles `GET /{channel}/connections?departureTime=...` — the
    /// fragment-locator read path.
    ///
    /// Maps the requested instant to the one partition whose half-open
    /// interval contains it.
    pub fn handle_fragment(&self, channel: &str, departure_time: &str) -> ServerResult<Partition> {
        let channel = self.context.channel(channel)?;
        let target = parse_timestamp(departure_time)
            .map_err(|_| ServerError::InvalidTimestamp(departure_time.to_string()))?;

        channel
            .index
            .locate(target)
            .cloned()
            .ok_or(ServerError::FragmentNotFound(target))
    }
}
