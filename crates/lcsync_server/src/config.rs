//! Server configuration.

use lcsync_engine::Normalization;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the sync server.
///
/// Per-channel datasets live under `data_dir`:
/// `<data_dir>/<channel>/events.json` for the event store and
/// `<data_dir>/<channel>/connections/` for the fragment partitions.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Supported channel (agency) keys.
    pub channels: Vec<String>,
    /// Root of the on-disk datasets.
    pub data_dir: PathBuf,
    /// Scheduler tick period.
    pub tick_interval: Duration,
    /// Timestamp comparison strategy.
    pub normalization: Normalization,
}

impl ServerConfig {
    /// Creates a configuration for the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            channels: vec!["sncb".to_string()],
            data_dir: data_dir.into(),
            tick_interval: Duration::from_secs(1),
            normalization: Normalization::None,
        }
    }

    /// Replaces the channel list.
    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.channels = channels;
        self
    }

    /// Adds a channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.push(channel.into());
        self
    }

    /// Sets the scheduler tick period.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the timestamp comparison strategy.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Path of a channel's event dataset.
    pub fn events_file(&self, channel: &str) -> PathBuf {
        self.data_dir.join(channel).join("events.json")
    }

    /// Path of a channel's fragment partition directory.
    pub fn connections_dir(&self, channel: &str) -> PathBuf {
        self.data_dir.join(channel).join("connections")
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.channels, ["sncb"]);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.normalization, Normalization::None);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("/var/lib/lcsync")
            .with_channels(vec!["sncb".into()])
            .with_channel("delijn")
            .with_tick_interval(Duration::from_millis(500))
            .with_normalization(Normalization::TimeOfDay);

        assert_eq!(config.channels, ["sncb", "delijn"]);
        assert_eq!(config.tick_interval, Duration::from_millis(500));
    }

    #[test]
    fn dataset_paths() {
        let config = ServerConfig::new("/data");
        assert_eq!(
            config.events_file("sncb"),
            PathBuf::from("/data/sncb/events.json")
        );
        assert_eq!(
            config.connections_dir("sncb"),
            PathBuf::from("/data/sncb/connections")
        );
    }
}
