//! # Payload
//!
//! The unit of data that flows through the bus.
//!
//! A payload is a source tag plus raw bytes. Handlers may reinterpret the
//! bytes (JSON, CSV rows, file paths) but a payload is never mutated once it
//! has been published; cloning is cheap because the bytes are reference
//! counted.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable unit of data with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Where the data came from (file path, handler name, ...).
    source: String,

    /// Raw payload bytes.
    data: Bytes,
}

impl Payload {
    /// Create a payload from a source tag and anything convertible to bytes.
    pub fn new(source: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            source: source.into(),
            data: data.into(),
        }
    }

    /// Get the source tag.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the raw bytes.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Build a new payload carrying this payload's source with different data.
    #[must_use]
    pub fn with_data(&self, data: impl Into<Bytes>) -> Self {
        Self {
            source: self.source.clone(),
            data: data.into(),
        }
    }

    /// Interpret the data as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Decode the data as JSON.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Human readable dump used by failure sinks and the stdout handler.
impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.as_text())
    }
}
