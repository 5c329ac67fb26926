//! # Workflow Test Suite
//!
//! Cross-crate scenarios that need the bus, the engine and the bundled
//! handlers together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs              # Shared handlers and wait helpers
//!     ├── pubsub.rs               # Bus delivery, backpressure, buffering
//!     ├── processor_lifecycle.rs  # Identity, start preconditions, failures
//!     ├── e2e.rs                  # Processor to processor over the bus
//!     └── real_life.rs            # Directory → CSV → filter → stdout
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p workflow-tests
//! cargo test -p workflow-tests integration::real_life
//! ```

#![allow(dead_code)]

pub mod integration;
