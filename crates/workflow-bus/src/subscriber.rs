//! # Topic Receiver
//!
//! Read side of a topic's direct channel handed out by `Bus::subscribe`.

use crate::payload::Payload;
use crate::topic::{SharedReceiver, Topic};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors from non-blocking receives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Another subscriber of the same topic is currently receiving.
    #[error("Topic receiver is busy")]
    Busy,
}

/// A subscription handle for receiving payloads from one topic.
///
/// All handles for the same topic name share one direct channel, so a
/// payload is received by exactly one of them. When dropped, the topic's
/// subscriber count is decremented.
pub struct TopicReceiver {
    topic: Arc<Topic>,
    receiver: SharedReceiver,
}

impl TopicReceiver {
    pub(crate) fn new(topic: Arc<Topic>, receiver: SharedReceiver) -> Self {
        Self { topic, receiver }
    }

    /// Name of the subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.name()
    }

    /// Receive the next payload.
    ///
    /// # Returns
    ///
    /// - `Some(payload)` - The next payload in publish order
    /// - `None` - Never while this handle exists; the topic it keeps alive
    ///   owns the sending half
    pub async fn recv(&self) -> Option<Payload> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Try to receive the next payload without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))` - A payload was available
    /// - `Ok(None)` - Nothing queued right now
    /// - `Err(SubscriptionError::Busy)` - Another subscriber holds the channel
    pub fn try_recv(&self) -> Result<Option<Payload>, SubscriptionError> {
        let mut receiver = self
            .receiver
            .try_lock()
            .map_err(|_| SubscriptionError::Busy)?;
        Ok(receiver.try_recv().ok())
    }
}

impl Drop for TopicReceiver {
    fn drop(&mut self) {
        self.topic.detach();
        debug!(topic = %self.topic.name(), "Subscription dropped");
    }
}

impl std::fmt::Debug for TopicReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicReceiver")
            .field("topic", &self.topic.name())
            .finish()
    }
}
