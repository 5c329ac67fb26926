//! Errors specific to the bundled handlers.
//!
//! They surface through `HandlerError::Custom`, so failure sinks see them
//! like any other handler error and tests can downcast to match a variant.

use thiserror::Error;
use workflow_engine::HandlerError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlersError {
    #[error("the payload is not a flat JSON map")]
    NotJsonMap,

    #[error("{path} is not a regular file")]
    NotAFile { path: String },

    #[error("csv row {row} could not be parsed: {reason}")]
    Csv { row: usize, reason: String },
}

impl From<HandlersError> for HandlerError {
    fn from(err: HandlersError) -> Self {
        HandlerError::Custom(Box::new(err))
    }
}

/// The bundled handler error inside `err`, if any.
#[must_use]
pub fn as_handlers_error(err: &HandlerError) -> Option<&HandlersError> {
    match err {
        HandlerError::Custom(inner) => inner.downcast_ref::<HandlersError>(),
        _ => None,
    }
}
