//! Terminal output.

use crate::output::Output;
use std::sync::Arc;
use workflow_bus::Payload;
use workflow_engine::{
    async_trait, Configuration, Handler, HandlerContext, HandlerError, PropertyError,
};
use workflow_telemetry::MetricProvider;

/// Prints every payload on standard output.
///
/// Properties:
/// - `forward` (bool, default false): also publish the payload to egress.
pub struct StdoutHandler {
    cfg: Configuration,
    forward: bool,
    output: Output,
}

impl StdoutHandler {
    #[must_use]
    pub fn new() -> Self {
        let cfg = Configuration::new();
        // Declared on a fresh configuration, cannot collide.
        let _ = cfg.add_property_with_default(
            "forward",
            "publish printed payloads to the egress topics",
            false,
            false,
        );
        Self {
            cfg,
            forward: false,
            output: Output::default(),
        }
    }

    /// Payloads forwarded so far.
    #[must_use]
    pub fn forwarded(&self) -> f64 {
        self.output.count()
    }
}

impl Default for StdoutHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for StdoutHandler {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        let payload = payload.ok_or(HandlerError::IngressRequired)?;
        println!("{}", payload.as_text());
        if self.forward {
            self.output.emit(ctx, egress, &payload)?;
        }
        Ok(())
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()?;
        self.forward = self.cfg.get_bool("forward").unwrap_or(false);
        Ok(())
    }

    fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>, label: &str) {
        self.output.attach(provider, label);
    }
}
