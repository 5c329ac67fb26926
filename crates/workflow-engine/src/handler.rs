//! # Handler Contract
//!
//! The pluggable processing logic a processor drives. A processor only ever
//! calls the four operations of this trait, so handlers can be tested in
//! isolation by calling `handle` with a hand-built `HandlerContext`.
//!
//! Handlers publish their own results: `handle` receives the processor's
//! egress topic names and decides what (if anything) goes downstream.

use crate::error::HandlerError;
use crate::property::{Configuration, PropertyError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use workflow_bus::{Bus, Payload};
use workflow_telemetry::MetricProvider;

/// Processing logic run by a processor.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Short handler name used in logs.
    fn name(&self) -> &'static str;

    /// Process one delivery.
    ///
    /// `payload` is `None` when the invocation was triggered by the
    /// processor's execution interval instead of an ingress topic.
    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError>;

    /// The handler's configuration handle.
    fn configuration(&self) -> &Configuration;

    /// Check required properties and cache parsed settings.
    ///
    /// Called by `Processor::start` before any invocation.
    fn validate_configuration(&mut self) -> Result<(), PropertyError>;

    /// Attach the metric provider; `label` is `<processor>_<id>`.
    fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>, label: &str);
}

/// Everything a handler invocation may need from its processor.
#[derive(Clone)]
pub struct HandlerContext {
    bus: Arc<Bus>,
    token: CancellationToken,
    processor_id: u64,
    processor_name: Arc<str>,
}

impl HandlerContext {
    /// Create a context; processors build one per `start`.
    #[must_use]
    pub fn new(
        bus: Arc<Bus>,
        token: CancellationToken,
        processor_id: u64,
        processor_name: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            bus,
            token,
            processor_id,
            processor_name: processor_name.into(),
        }
    }

    /// Context detached from any processor, for driving handlers directly.
    #[must_use]
    pub fn standalone(bus: Arc<Bus>) -> Self {
        Self::new(bus, CancellationToken::new(), 0, "standalone")
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn processor_id(&self) -> u64 {
        self.processor_id
    }

    #[must_use]
    pub fn processor_name(&self) -> &str {
        &self.processor_name
    }

    /// Publish `payload` to every egress topic.
    ///
    /// Topics that reject the payload are reported together in
    /// `HandlerError::Publish`; the others still receive it.
    pub fn publish(&self, egress: &[String], payload: &Payload) -> Result<(), HandlerError> {
        let errors = self.bus.publish(egress, payload);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HandlerError::Publish(errors))
        }
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("processor_id", &self.processor_id)
            .field("processor_name", &self.processor_name)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
