//! # lcsync Server
//!
//! The logical request surface of the lcsync event server.
//!
//! This crate provides:
//! - `SyncServer` — the facade over per-channel stores and the shared
//!   delivery scheduler
//! - Transport adapters: poll, push stream, duplex session
//! - The ingest surface and the fragment-locator read path
//!
//! # Architecture
//!
//! Each channel (agency) owns an event store and an interval index; one
//! scheduler drives every push/duplex cursor across all channels from a
//! single tick loop. Transport framing (HTTP routing, SSE/WebSocket
//! framing) is left to the embedding application:
//!
//! ```rust,ignore
//! use lcsync_server::{ServerConfig, SyncServer};
//!
//! let server = SyncServer::open(ServerConfig::default())?;
//!
//! // GET /{channel}/events/poll?lastSyncTime=...
//! let frame = server.handle_poll("sncb", "2024-01-01T10:00:00Z")?;
//!
//! // Long-lived connections
//! let mut session = server.open_push("sncb", "2024-01-01T10:00:00Z")?;
//! while let Some(frame) = session.next_frame().await { /* write to wire */ }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod config;
mod error;
mod handler;
mod server;
mod session;

pub use channel::ChannelState;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::SyncServer;
pub use session::{DuplexSession, PushSession};
