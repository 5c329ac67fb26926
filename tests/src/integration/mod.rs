//! Integration scenarios.

pub mod e2e;
pub mod processor_lifecycle;
pub mod pubsub;
pub mod real_life;
pub mod support;
