//! # Workflow Engine
//!
//! Processors, the handler contract they drive, and the configuration
//! properties handlers declare.
//!
//! ## Architecture
//!
//! ```text
//!   ingress topics ──→ ┌───────────────────────────────┐ ──→ egress topics
//!                      │ Processor (id, name)          │
//!   interval tick ───→ │   └─ Handler::handle(payload) │
//!                      └───────────────┬───────────────┘
//!                                      │ HandlerError
//!                                      ↓
//!                              Failure → failure handler
//! ```
//!
//! Processors never call each other; everything crosses the bus.
//!
//! ## Quick Start
//!
//! ```ignore
//! let bus = Arc::new(Bus::new());
//! let mut printer = Processor::new("printer", Arc::clone(&bus), &[]);
//! printer.set_handler(MyHandler::default());
//! printer.subscribe(&["lines"])?;
//! printer.start(Some(CancellationToken::new()))?;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod error;
pub mod failure;
pub mod handler;
pub mod processor;
pub mod property;
pub mod workflow;

// Re-export main types
pub use config::EngineConfig;
pub use error::{HandlerError, ProcessorError};
pub use failure::{default_failure_handler, print_failure, Failure, FailureHandler};
pub use handler::{Handler, HandlerContext};
pub use processor::Processor;
pub use property::{Configuration, Property, PropertyError, PropertyKind, PropertyValue};
pub use workflow::Workflow;

// Handler implementors need these alongside the trait.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
