//! # Workflow Telemetry
//!
//! Observability for workflow pipelines.
//!
//! ## Components
//!
//! - **Tracing**: `tracing-subscriber` registry with env filter and pretty
//!   or JSON output
//! - **Metrics**: the `MetricProvider` trait processors and handlers count
//!   payloads with, backed by Prometheus counters
//!
//! ## Usage
//!
//! ```rust,ignore
//! use workflow_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() {
//!     init_tracing(&TelemetryConfig::from_env()).expect("Failed to init tracing");
//!     // Build and start processors here
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WF_SERVICE_NAME` | `workflow` | Service name in log lines |
//! | `WF_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honored) |
//! | `WF_JSON_LOGS` | `false` | JSON formatted logs |
//! | `WF_CONSOLE_OUTPUT` | `true` | Write logs to the console |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    payloads_in_metric, payloads_out_metric, Metric, MetricError, MetricProvider,
    PrometheusProvider,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
