//! Metric providers for processors and handlers.
//!
//! Processors and handlers only see the `MetricProvider` trait. Counter
//! names follow the convention `<processor>_<id>_payloads_in` and
//! `<processor>_<id>_payloads_out`; other components read them by name.
//!
//! `PrometheusProvider` keeps one `prometheus::Registry` per provider so
//! that independent pipelines (and tests) never collide on metric names.

use parking_lot::RwLock;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from metric operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricError {
    #[error("Invalid metric name: {0:?}")]
    InvalidName(String),

    #[error("No such metric: {0}")]
    NotFound(String),

    #[error("Counters can only increase, got {0}")]
    NegativeIncrement(f64),

    #[error("Metric registry error: {0}")]
    Registry(String),
}

/// Point-in-time view of a counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub value: f64,
}

/// Registers and increments named counters.
pub trait MetricProvider: Send + Sync {
    /// Register a counter. Registering an existing name is a no-op.
    fn add_metric(&self, name: &str, description: &str) -> Result<(), MetricError>;

    /// Increase a registered counter by `value`.
    fn inc_metric(&self, name: &str, value: f64) -> Result<(), MetricError>;

    /// Current state of one counter.
    fn get_metric(&self, name: &str) -> Option<Metric>;

    /// Current state of every counter, keyed by name.
    fn get_metrics(&self) -> HashMap<String, Metric>;
}

/// Counter name used by a processor for incoming payloads.
#[must_use]
pub fn payloads_in_metric(label: &str) -> String {
    format!("{}_payloads_in", label)
}

/// Counter name used by a handler for payloads it emitted.
#[must_use]
pub fn payloads_out_metric(label: &str) -> String {
    format!("{}_payloads_out", label)
}

struct RegisteredCounter {
    counter: Counter,
    description: String,
}

/// Prometheus backed metric provider.
pub struct PrometheusProvider {
    registry: Registry,
    counters: RwLock<HashMap<String, RegisteredCounter>>,
}

impl PrometheusProvider {
    /// Create a provider with its own registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a provider registering into an existing registry.
    #[must_use]
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            counters: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying registry, e.g. for an exporter endpoint.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all counters in the Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricError::Registry(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricError::Registry(e.to_string()))
    }
}

impl Default for PrometheusProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProvider for PrometheusProvider {
    fn add_metric(&self, name: &str, description: &str) -> Result<(), MetricError> {
        if name.is_empty() {
            return Err(MetricError::InvalidName(name.to_string()));
        }
        if self.counters.read().contains_key(name) {
            return Ok(());
        }

        let mut counters = self.counters.write();
        if counters.contains_key(name) {
            return Ok(());
        }

        let help = if description.is_empty() { name } else { description };
        let counter = Counter::with_opts(Opts::new(sanitize_metric_name(name), help))
            .map_err(|e| MetricError::Registry(e.to_string()))?;
        self.registry
            .register(Box::new(counter.clone()))
            .map_err(|e| MetricError::Registry(e.to_string()))?;

        counters.insert(
            name.to_string(),
            RegisteredCounter {
                counter,
                description: description.to_string(),
            },
        );
        Ok(())
    }

    fn inc_metric(&self, name: &str, value: f64) -> Result<(), MetricError> {
        if value < 0.0 {
            return Err(MetricError::NegativeIncrement(value));
        }
        let counters = self.counters.read();
        let registered = counters
            .get(name)
            .ok_or_else(|| MetricError::NotFound(name.to_string()))?;
        registered.counter.inc_by(value);
        Ok(())
    }

    fn get_metric(&self, name: &str) -> Option<Metric> {
        self.counters.read().get(name).map(|registered| Metric {
            name: name.to_string(),
            description: registered.description.clone(),
            value: registered.counter.get(),
        })
    }

    fn get_metrics(&self) -> HashMap<String, Metric> {
        self.counters
            .read()
            .iter()
            .map(|(name, registered)| {
                (
                    name.clone(),
                    Metric {
                        name: name.clone(),
                        description: registered.description.clone(),
                        value: registered.counter.get(),
                    },
                )
            })
            .collect()
    }
}

/// Map an arbitrary label onto Prometheus' `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn sanitize_metric_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}
