//! # Topic
//!
//! A named endpoint holding a bounded direct channel and an optional
//! bounded overflow buffer.
//!
//! ## Lifecycle
//!
//! - A topic is created on the first `subscribe` or `publish` naming it.
//! - The direct channel is created by the first subscriber and keeps that
//!   capacity for the topic's lifetime. A topic created by `publish` has no
//!   direct channel yet, so everything published to it lands in the buffer.
//! - The buffer is flushed into the direct channel only by an explicit drain.
//!
//! ```text
//! publish ──try_send──→ [direct channel] ──recv──→ subscribers
//!    │ full                   ↑
//!    ↓                        │ drain (FIFO)
//! [buffer] ───────────────────┘
//! ```

use crate::error::BusError;
use crate::payload::Payload;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

/// Receiving half of a direct channel, shared by every subscriber of a topic.
///
/// Subscribers compete for messages: each payload is received exactly once,
/// by whichever subscriber locks the receiver first.
pub(crate) type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Payload>>>;

/// The primary delivery path of a topic.
pub(crate) struct DirectChannel {
    sender: mpsc::Sender<Payload>,
    receiver: SharedReceiver,
    capacity: usize,
}

impl DirectChannel {
    fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            capacity,
        }
    }
}

/// Bounded FIFO absorbing overflow from the direct channel.
struct TopicBuffer {
    queue: VecDeque<Payload>,
    capacity: usize,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The payload went straight into the direct channel.
    Direct,
    /// The direct channel was full (or missing) and the payload was queued.
    Buffered,
}

/// A named topic.
pub struct Topic {
    name: String,

    /// Created by the first subscriber; capacity fixed afterwards.
    direct: OnceLock<DirectChannel>,

    /// Overflow buffer. `None` means the topic applies backpressure.
    buffer: Mutex<Option<TopicBuffer>>,

    /// Active subscriber handles.
    subscribers: AtomicUsize,
}

impl Topic {
    pub(crate) fn new(name: impl Into<String>, buffer_capacity: usize) -> Self {
        let buffer = (buffer_capacity > 0).then(|| TopicBuffer {
            queue: VecDeque::new(),
            capacity: buffer_capacity,
        });
        Self {
            name: name.into(),
            direct: OnceLock::new(),
            buffer: Mutex::new(buffer),
            subscribers: AtomicUsize::new(0),
        }
    }

    /// Topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity of the direct channel, or `None` if nobody subscribed yet.
    #[must_use]
    pub fn direct_capacity(&self) -> Option<usize> {
        self.direct.get().map(|d| d.capacity)
    }

    /// Whether overflow is queued instead of rejected.
    #[must_use]
    pub fn has_buffer(&self) -> bool {
        self.buffer.lock().is_some()
    }

    /// Number of payloads waiting in the buffer.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().as_ref().map_or(0, |b| b.queue.len())
    }

    /// Number of active subscriber handles.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::Acquire)
    }

    /// Attach a subscriber, creating the direct channel and enabling the
    /// buffer when needed. Returns the shared receiver.
    pub(crate) fn attach(&self, direct_capacity: usize, buffer_capacity: usize) -> SharedReceiver {
        let direct = self.direct.get_or_init(|| DirectChannel::new(direct_capacity));

        if buffer_capacity > 0 {
            let mut buffer = self.buffer.lock();
            if buffer.is_none() {
                *buffer = Some(TopicBuffer {
                    queue: VecDeque::new(),
                    capacity: buffer_capacity,
                });
            }
        }

        self.subscribers.fetch_add(1, Ordering::AcqRel);
        Arc::clone(&direct.receiver)
    }

    pub(crate) fn detach(&self) {
        // Saturating: never wrap below zero.
        let _ = self
            .subscribers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Non-blocking publish into the direct channel, falling back to the buffer.
    pub(crate) fn offer(&self, payload: Payload) -> Result<Delivery, BusError> {
        let payload = match self.direct.get() {
            Some(direct) => match direct.sender.try_send(payload) {
                Ok(()) => return Ok(Delivery::Direct),
                // The topic owns a receiver, so the channel never closes.
                Err(mpsc::error::TrySendError::Full(p) | mpsc::error::TrySendError::Closed(p)) => p,
            },
            None => payload,
        };

        let mut guard = self.buffer.lock();
        let Some(buffer) = guard.as_mut() else {
            return Err(BusError::TopicFull {
                topic: self.name.clone(),
            });
        };
        if buffer.queue.len() >= buffer.capacity {
            return Err(BusError::BufferFull {
                topic: self.name.clone(),
                capacity: buffer.capacity,
            });
        }
        buffer.queue.push_back(payload);
        Ok(Delivery::Buffered)
    }

    /// Move as many buffered payloads as fit into the direct channel.
    ///
    /// The buffer lock is held for the whole pass so concurrent drains and
    /// buffered publishes cannot reorder the queue. Returns how many payloads
    /// were moved.
    pub(crate) fn drain(&self) -> usize {
        let Some(direct) = self.direct.get() else {
            return 0;
        };

        let mut guard = self.buffer.lock();
        let Some(buffer) = guard.as_mut() else {
            return 0;
        };

        let mut moved = 0;
        while let Some(payload) = buffer.queue.pop_front() {
            match direct.sender.try_send(payload) {
                Ok(()) => moved += 1,
                Err(mpsc::error::TrySendError::Full(p) | mpsc::error::TrySendError::Closed(p)) => {
                    buffer.queue.push_front(p);
                    break;
                }
            }
        }
        moved
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("direct_capacity", &self.direct_capacity())
            .field("buffer_len", &self.buffer_len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
