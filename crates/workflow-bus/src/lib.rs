//! # Workflow Bus - Topic Based Publish/Subscribe
//!
//! The only channel processors use to talk to each other.
//!
//! ## Delivery Rules
//!
//! - **Direct channel:** every topic has one bounded channel shared by all of
//!   its subscribers. Publishing is a non-blocking send.
//! - **Backpressure:** if the direct channel is full and the topic has no
//!   buffer, `publish` reports `BusError::TopicFull` for that topic and the
//!   payload is dropped. Producers never block.
//! - **Buffer:** a buffered topic queues overflow instead; queued payloads
//!   reach subscribers only after `drain_topics_buffer`.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Processor A  │                    │ Processor B  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │     Bus      │          │
//!                  │ topic→channel│ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Subscribers sharing a topic name compete for its payloads; each payload
//! is received once. Fan-out to several processors uses several topic names.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod payload;
pub mod publisher;
pub mod subscriber;
pub mod topic;

// Re-export main types
pub use error::BusError;
pub use payload::Payload;
pub use publisher::{Bus, BusStats};
pub use subscriber::{SubscriptionError, TopicReceiver};
pub use topic::{Delivery, Topic};

/// Buffer capacity for topics created by `publish` before anyone subscribed.
pub const DEFAULT_TOPIC_BUFFER_CAPACITY: usize = 1000;
