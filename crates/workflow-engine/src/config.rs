//! # Engine Configuration
//!
//! Sizing for topics created through processors, and the optional periodic
//! buffer drain.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use workflow_bus::DEFAULT_TOPIC_BUFFER_CAPACITY;

/// Engine wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Direct channel capacity requested by `Processor::subscribe`.
    pub subscriber_capacity: usize,

    /// Buffer capacity requested by `Processor::subscribe` (0 = unbuffered).
    pub subscriber_buffer_capacity: usize,

    /// Buffer capacity of topics created by `publish` before any subscriber.
    pub topic_buffer_capacity: usize,

    /// When set, `Workflow::start` drains all topic buffers at this period.
    pub drain_interval_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 100,
            subscriber_buffer_capacity: 1000,
            topic_buffer_capacity: DEFAULT_TOPIC_BUFFER_CAPACITY,
            drain_interval_ms: None,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `WF_SUBSCRIBER_CAPACITY`: Direct channel capacity (default: 100)
    /// - `WF_SUBSCRIBER_BUFFER`: Subscriber buffer capacity (default: 1000)
    /// - `WF_TOPIC_BUFFER`: Buffer for publish-created topics (default: 1000)
    /// - `WF_DRAIN_INTERVAL_MS`: Periodic drain period (default: disabled)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            subscriber_capacity: parse_env("WF_SUBSCRIBER_CAPACITY")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.subscriber_capacity),
            subscriber_buffer_capacity: parse_env("WF_SUBSCRIBER_BUFFER")
                .unwrap_or(defaults.subscriber_buffer_capacity),
            topic_buffer_capacity: parse_env("WF_TOPIC_BUFFER")
                .unwrap_or(defaults.topic_buffer_capacity),
            drain_interval_ms: env::var("WF_DRAIN_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&ms: &u64| ms > 0),
        }
    }

    /// Periodic drain period, if enabled.
    #[must_use]
    pub fn drain_interval(&self) -> Option<Duration> {
        self.drain_interval_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

fn parse_env(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
