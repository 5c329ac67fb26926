//! Failures raised inside processor run loops.
//!
//! A handler error during live delivery cannot be returned to a caller, so
//! the processor wraps it in a `Failure` together with its own identity and
//! the payload in flight, and hands it to the failure handler. Failures are
//! never retried.

use crate::error::HandlerError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use workflow_bus::Payload;

/// Sink for failures; the default is [`print_failure`].
pub type FailureHandler = Arc<dyn Fn(Failure) + Send + Sync>;

/// A handler error correlated with its processor and payload.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    /// The error that occurred.
    #[serde(serialize_with = "serialize_error")]
    error: Arc<HandlerError>,

    /// Identity of the processor that raised it.
    processor: u64,

    /// Payload being processed, absent for timer invocations.
    payload: Option<Payload>,
}

impl Failure {
    #[must_use]
    pub fn new(error: HandlerError, processor: u64, payload: Option<Payload>) -> Self {
        Self {
            error: Arc::new(error),
            processor,
            payload,
        }
    }

    #[must_use]
    pub fn error(&self) -> &HandlerError {
        &self.error
    }

    #[must_use]
    pub fn processor(&self) -> u64 {
        self.processor
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(payload) => write!(
                f,
                "{} cast by {} with payload {}",
                self.error, self.processor, payload
            ),
            None => write!(
                f,
                "{} cast by {} with no payload attached",
                self.error, self.processor
            ),
        }
    }
}

fn serialize_error<S: serde::Serializer>(
    error: &Arc<HandlerError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Default failure handler: one human readable line on standard output.
pub fn print_failure(failure: Failure) {
    warn!(
        processor_id = failure.processor,
        error = %failure.error,
        has_payload = failure.payload.is_some(),
        "Handler failure"
    );
    println!("{}", failure);
}

/// The default failure handler as a shareable sink.
#[must_use]
pub fn default_failure_handler() -> FailureHandler {
    Arc::new(print_failure)
}
