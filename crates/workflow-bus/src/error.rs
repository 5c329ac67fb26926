//! Error types for the bus.

use thiserror::Error;

/// Errors returned by bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Topic names must not be empty.
    #[error("Topic name must not be empty")]
    EmptyTopicName,

    /// A subscriber asked for a direct channel that cannot hold anything.
    #[error("Invalid capacity for topic {topic}: direct channel capacity must be at least 1")]
    InvalidCapacity { topic: String },

    /// The direct channel is full and the topic has no buffer.
    #[error("Topic {topic} is full")]
    TopicFull { topic: String },

    /// The direct channel and the overflow buffer are both full.
    #[error("Topic {topic} buffer is full ({capacity} payloads)")]
    BufferFull { topic: String, capacity: usize },
}

impl BusError {
    /// The topic this error refers to, if any.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        match self {
            Self::EmptyTopicName => None,
            Self::InvalidCapacity { topic }
            | Self::TopicFull { topic }
            | Self::BufferFull { topic, .. } => Some(topic),
        }
    }
}
