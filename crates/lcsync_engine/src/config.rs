//! Configuration for the delivery scheduler.

use crate::evaluator::Normalization;
use std::time::Duration;

/// Configuration for the delivery scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period of the re-evaluation tick.
    pub tick_interval: Duration,
    /// Timestamp comparison strategy for all evaluations.
    pub normalization: Normalization,
}

impl SchedulerConfig {
    /// Creates a configuration with the given tick interval.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            normalization: Normalization::None,
        }
    }

    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the normalization strategy.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
