//! # Workflow Handlers
//!
//! Ready made `Handler` implementations.
//!
//! | Handler | Trigger | Emits |
//! |---------|---------|-------|
//! | `ListDirectoryHandler` | execution interval | file paths |
//! | `ReadFileHandler` | path payload | file contents, source = path |
//! | `ParseCsvHandler` | CSV payload | one JSON object per row |
//! | `MapFilterHandler` | JSON object payload | the payload, if it matches |
//! | `StdoutHandler` | any payload | the payload, if `forward` is set |
//!
//! Every handler counts what it publishes in `<processor>_<id>_payloads_out`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod files;
pub mod filters;
mod output;
pub mod parsers;
pub mod terminal;

pub use error::{as_handlers_error, HandlersError};
pub use files::{ListDirectoryHandler, ReadFileHandler};
pub use filters::MapFilterHandler;
pub use parsers::ParseCsvHandler;
pub use terminal::StdoutHandler;
