//! The sync server facade.

use crate::channel::ChannelState;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::session::{DuplexSession, PushSession};
use lcsync_engine::{DeliveryScheduler, Partition, TransportKind};
use lcsync_protocol::{parse_timestamp, IngestRequest, SyncFrame};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// The server: per-channel datasets, the request handlers, and the
/// shared delivery scheduler behind one facade.
///
/// Transport framing is the embedding application's job; this type owns
/// everything beneath it. Clone-free sharing happens through
/// [`scheduler`](Self::scheduler) and the session types.
pub struct SyncServer {
    context: Arc<HandlerContext>,
    handler: RequestHandler,
    shutdown: watch::Sender<bool>,
}

impl SyncServer {
    /// Opens a server, loading every configured channel's datasets from
    /// disk.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let mut channels = Vec::with_capacity(config.channels.len());
        for name in &config.channels {
            channels.push(ChannelState::load(name, &config)?);
        }
        info!(channels = channels.len(), "server opened");
        Ok(Self::from_channels(config, channels))
    }

    /// Creates a server with empty in-memory channels (tests, embedding).
    pub fn in_memory(config: ServerConfig) -> Self {
        let channels = config
            .channels
            .iter()
            .map(ChannelState::in_memory)
            .collect();
        Self::from_channels(config, channels)
    }

    /// Creates a server around already-built channels.
    pub fn from_channels(config: ServerConfig, channels: Vec<ChannelState>) -> Self {
        let context = Arc::new(HandlerContext::new(config, channels));
        let handler = RequestHandler::new(Arc::clone(&context));
        let (shutdown, _) = watch::channel(false);
        Self {
            context,
            handler,
            shutdown,
        }
    }

    /// Serves a poll request: one window, one frame, no retained state.
    pub fn handle_poll(&self, channel: &str, last_sync_time: &str) -> ServerResult<SyncFrame> {
        self.handler.handle_poll(channel, last_sync_time)
    }

    /// Appends an ingested record to a channel's store.
    pub fn handle_ingest(&self, channel: &str, request: IngestRequest) -> ServerResult<()> {
        self.handler.handle_ingest(channel, request)
    }

    /// Resolves which fragment partition contains an instant.
    pub fn handle_fragment(&self, channel: &str, departure_time: &str) -> ServerResult<Partition> {
        self.handler.handle_fragment(channel, departure_time)
    }

    /// Opens a push stream anchored at `last_sync_time`.
    pub fn open_push(&self, channel: &str, last_sync_time: &str) -> ServerResult<PushSession> {
        let channel = self.context.channel(channel)?;
        let anchor = parse_timestamp(last_sync_time)
            .map_err(|_| ServerError::InvalidTimestamp(last_sync_time.to_string()))?;

        let (_, _, session) = PushSession::open(
            Arc::clone(&self.context.scheduler),
            Arc::clone(&channel.store),
            anchor,
            TransportKind::Push,
        )?;
        Ok(session)
    }

    /// Opens a duplex session anchored at `last_sync_time`.
    pub fn open_duplex(&self, channel: &str, last_sync_time: &str) -> ServerResult<DuplexSession> {
        let channel = self.context.channel(channel)?;
        let anchor = parse_timestamp(last_sync_time)
            .map_err(|_| ServerError::InvalidTimestamp(last_sync_time.to_string()))?;

        DuplexSession::open(
            Arc::clone(&self.context.scheduler),
            Arc::clone(&channel.store),
            anchor,
        )
    }

    /// Returns the shared delivery scheduler.
    pub fn scheduler(&self) -> &Arc<DeliveryScheduler> {
        &self.context.scheduler
    }

    /// Returns the shared handler context.
    pub fn context(&self) -> &Arc<HandlerContext> {
        &self.context
    }

    /// Runs the delivery tick loop until [`shutdown`](Self::shutdown) is
    /// called.
    pub async fn run(&self) {
        let receiver = self.shutdown.subscribe();
        self.context.scheduler.run(receiver).await;
    }

    /// Signals the tick loop to stop; the in-flight tick finishes first.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Closes every cursor immediately, without waiting for the loop.
    pub fn close(&self) {
        self.shutdown();
        self.context.scheduler.close_all();
    }
}
