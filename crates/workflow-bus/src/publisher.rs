//! # Bus
//!
//! The registry of named topics and the publish/subscribe/drain operations.

use crate::error::BusError;
use crate::payload::Payload;
use crate::subscriber::TopicReceiver;
use crate::topic::{Delivery, Topic};
use crate::DEFAULT_TOPIC_BUFFER_CAPACITY;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Snapshot of bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Payloads accepted into a direct channel.
    pub published: u64,
    /// Payloads queued into a topic buffer.
    pub buffered: u64,
    /// Payloads rejected (topic or buffer full).
    pub dropped: u64,
    /// Payloads moved from buffers into direct channels.
    pub drained: u64,
}

/// In-memory topic bus.
///
/// Topics are created on first reference and live as long as the bus.
/// Share it between processors behind an `Arc`.
pub struct Bus {
    /// Name -> topic registry.
    topics: RwLock<HashMap<String, Arc<Topic>>>,

    /// Buffer capacity for topics that are created by `publish`.
    default_buffer_capacity: usize,

    published: AtomicU64,
    buffered: AtomicU64,
    dropped: AtomicU64,
    drained: AtomicU64,
}

impl Bus {
    /// Create a bus with the default buffer capacity for publish-created topics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer_capacity(DEFAULT_TOPIC_BUFFER_CAPACITY)
    }

    /// Create a bus whose publish-created topics buffer up to `capacity`
    /// payloads. Zero disables buffering for those topics.
    #[must_use]
    pub fn with_buffer_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            default_buffer_capacity: capacity,
            published: AtomicU64::new(0),
            buffered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            drained: AtomicU64::new(0),
        }
    }

    fn topic_or_create(&self, name: &str, buffer_capacity: usize) -> Arc<Topic> {
        if let Some(topic) = self.topics.read().get(name) {
            return Arc::clone(topic);
        }

        let mut topics = self.topics.write();
        Arc::clone(topics.entry(name.to_string()).or_insert_with(|| {
            debug!(topic = name, "Topic created");
            Arc::new(Topic::new(name, buffer_capacity))
        }))
    }

    /// Subscribe to a topic.
    ///
    /// `direct_capacity` sizes the direct channel the first time the topic
    /// gets one; later subscribers share that channel unchanged. A non-zero
    /// `buffer_capacity` enables the topic buffer if it has none yet.
    pub fn subscribe(
        &self,
        name: &str,
        direct_capacity: usize,
        buffer_capacity: usize,
    ) -> Result<TopicReceiver, BusError> {
        if name.is_empty() {
            return Err(BusError::EmptyTopicName);
        }
        if direct_capacity == 0 {
            return Err(BusError::InvalidCapacity {
                topic: name.to_string(),
            });
        }

        let topic = self.topic_or_create(name, 0);
        let receiver = topic.attach(direct_capacity, buffer_capacity);

        debug!(
            topic = name,
            subscribers = topic.subscriber_count(),
            direct_capacity = ?topic.direct_capacity(),
            "New subscription created"
        );

        Ok(TopicReceiver::new(topic, receiver))
    }

    /// Publish a payload to a single topic.
    pub fn publish_one(&self, name: &str, payload: Payload) -> Result<Delivery, BusError> {
        if name.is_empty() {
            return Err(BusError::EmptyTopicName);
        }

        let topic = self.topic_or_create(name, self.default_buffer_capacity);
        match topic.offer(payload) {
            Ok(Delivery::Direct) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                debug!(topic = name, "Payload published");
                Ok(Delivery::Direct)
            }
            Ok(Delivery::Buffered) => {
                self.buffered.fetch_add(1, Ordering::Relaxed);
                debug!(topic = name, buffer_len = topic.buffer_len(), "Payload buffered");
                Ok(Delivery::Buffered)
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(topic = name, error = %e, "Payload dropped");
                Err(e)
            }
        }
    }

    /// Publish a payload to every named topic.
    ///
    /// Fan-out is independent per topic: the returned list holds one error
    /// for each topic that rejected the payload and is empty on full success.
    pub fn publish<S: AsRef<str>>(&self, names: &[S], payload: &Payload) -> Vec<BusError> {
        names
            .iter()
            .filter_map(|name| self.publish_one(name.as_ref(), payload.clone()).err())
            .collect()
    }

    /// Move buffered payloads into direct channels wherever there is room.
    ///
    /// Returns the number of payloads moved.
    pub fn drain_topics_buffer(&self) -> usize {
        let topics: Vec<Arc<Topic>> = self.topics.read().values().cloned().collect();

        let moved: usize = topics
            .iter()
            .filter(|topic| topic.buffer_len() > 0)
            .map(|topic| {
                let moved = topic.drain();
                if moved > 0 {
                    debug!(topic = topic.name(), moved, remaining = topic.buffer_len(), "Buffer drained");
                }
                moved
            })
            .sum();

        self.drained.fetch_add(moved as u64, Ordering::Relaxed);
        moved
    }

    /// Drain all topic buffers every `period` until `token` is cancelled.
    ///
    /// The bus never drains by itself; this is an opt-in helper for
    /// integrators. Must be called from within a Tokio runtime.
    pub fn spawn_periodic_drain(
        self: &Arc<Self>,
        period: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let bus = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(period_ms = period.as_millis() as u64, "Periodic buffer drain started");
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        bus.drain_topics_buffer();
                    }
                }
            }
            info!("Periodic buffer drain stopped");
        })
    }

    /// Look up a topic by name.
    #[must_use]
    pub fn topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.read().get(name).cloned()
    }

    /// Whether a topic with this name exists.
    #[must_use]
    pub fn has_topic(&self, name: &str) -> bool {
        self.topics.read().contains_key(name)
    }

    /// Names of all known topics, sorted.
    #[must_use]
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Payloads waiting in a topic's buffer (0 for unknown topics).
    #[must_use]
    pub fn buffer_len(&self, name: &str) -> usize {
        self.topic(name).map_or(0, |t| t.buffer_len())
    }

    /// Active subscribers of a topic (0 for unknown topics).
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.topic(name).map_or(0, |t| t.subscriber_count())
    }

    /// Buffer capacity given to topics created by `publish`.
    #[must_use]
    pub fn default_buffer_capacity(&self) -> usize {
        self.default_buffer_capacity
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("topics", &self.topic_names())
            .field("stats", &self.stats())
            .finish()
    }
}
