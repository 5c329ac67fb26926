//! Error types for processors and handlers.
//!
//! Lifecycle problems (`ProcessorError`) are returned synchronously to the
//! caller of `Processor::start` or `Processor::subscribe`. Problems inside
//! the run loop (`HandlerError`) cannot be returned to anyone and are routed
//! to the processor's failure handler instead.

use crate::property::PropertyError;
use thiserror::Error;
use workflow_bus::BusError;
use workflow_telemetry::MetricError;

/// Errors from processor lifecycle operations.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("the processor has no handler applied")]
    NoHandlerApplied,

    #[error("nil context is not allowed when starting a processor")]
    NilContext,

    #[error("required properties not fulfilled: {0}")]
    RequiredPropertiesNotFulfilled(#[source] PropertyError),

    #[error("processor {0} is already running")]
    AlreadyRunning(u64),

    #[error("processor must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("subscribe failed: {0}")]
    Subscribe(#[from] BusError),

    #[error("metric registration failed: {0}")]
    Metric(#[from] MetricError),

    #[error("processor {processor} failed to start: {source}")]
    Start {
        processor: String,
        #[source]
        source: Box<ProcessorError>,
    },
}

/// Errors returned by `Handler::handle`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("the processor needs an ingress to properly run")]
    IngressRequired,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("failed to publish to {} topic(s): {}", .0.len(), join_errors(.0))]
    Publish(Vec<BusError>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

fn join_errors(errors: &[BusError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
