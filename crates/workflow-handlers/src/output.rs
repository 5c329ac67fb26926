//! Egress publishing with an outgoing payload counter.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};
use workflow_bus::Payload;
use workflow_engine::{HandlerContext, HandlerError};
use workflow_telemetry::{payloads_out_metric, MetricProvider};

/// `<label>_payloads_out` counter, set once the processor hands over its
/// metric provider.
#[derive(Default)]
pub(crate) struct Output {
    metric: RwLock<Option<(Arc<dyn MetricProvider>, String)>>,
}

impl Output {
    pub(crate) fn attach(&self, provider: Arc<dyn MetricProvider>, label: &str) {
        let name = payloads_out_metric(label);
        if let Err(e) = provider.add_metric(&name, "Payloads published by the handler") {
            warn!(metric = %name, error = %e, "Failed to register metric");
            return;
        }
        *self.metric.write() = Some((provider, name));
    }

    /// Name of the counter, once attached.
    #[cfg(test)]
    pub(crate) fn metric_name(&self) -> Option<String> {
        self.metric.read().as_ref().map(|(_, name)| name.clone())
    }

    /// Publish to every egress topic and count the payload.
    ///
    /// The payload counts once if any egress topic accepted it (or there is
    /// no egress at all); rejections are still reported as
    /// `HandlerError::Publish`.
    pub(crate) fn emit(
        &self,
        ctx: &HandlerContext,
        egress: &[String],
        payload: &Payload,
    ) -> Result<(), HandlerError> {
        debug!(
            processor_id = ctx.processor_id(),
            source = payload.source(),
            bytes = payload.len(),
            "Emitting payload"
        );
        let errors = ctx.bus().publish(egress, payload);
        if egress.is_empty() || errors.len() < egress.len() {
            if let Some((provider, name)) = self.metric.read().as_ref() {
                provider.inc_metric(name, 1.0)?;
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(HandlerError::Publish(errors))
        }
    }

    /// Current counter value; 0 when no provider is attached.
    pub(crate) fn count(&self) -> f64 {
        self.metric
            .read()
            .as_ref()
            .and_then(|(provider, name)| provider.get_metric(name))
            .map_or(0.0, |m| m.value)
    }
}
