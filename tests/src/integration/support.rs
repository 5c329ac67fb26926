//! Shared fixtures for the integration scenarios.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use workflow_bus::Payload;
use workflow_engine::{
    Configuration, Failure, Handler, HandlerContext, HandlerError, PropertyError,
};
use workflow_telemetry::{init_tracing, MetricProvider, TelemetryConfig};

static TRACING: Once = Once::new();

/// Install the tracing subscriber once per test binary.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let config = TelemetryConfig {
            log_level: "warn".to_string(),
            ..TelemetryConfig::for_pipeline("tests")
        };
        // Another harness may have installed a subscriber already.
        let _ = init_tracing(&config);
    });
}

/// Poll `condition` every few milliseconds until it holds or `limit` passes.
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, condition: F) -> bool {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

/// Publishes one fixed payload on its first timer tick, then stays quiet.
pub struct OneShotSender {
    cfg: Configuration,
    payload: Payload,
    sent: AtomicBool,
}

impl OneShotSender {
    pub fn new(payload: Payload) -> Self {
        Self {
            cfg: Configuration::new(),
            payload,
            sent: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Handler for OneShotSender {
    fn name(&self) -> &'static str {
        "one_shot_sender"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        _payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        if self.sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        ctx.publish(egress, &self.payload)
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()
    }

    fn set_metric_provider(&mut self, _provider: Arc<dyn MetricProvider>, _label: &str) {}
}

/// Records payload texts; errors on payloads whose text starts with `bad`.
pub struct Recorder {
    cfg: Configuration,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                cfg: Configuration::new(),
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

#[async_trait]
impl Handler for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(
        &self,
        ctx: &HandlerContext,
        payload: Option<Payload>,
        egress: &[String],
    ) -> Result<(), HandlerError> {
        let payload = payload.ok_or(HandlerError::IngressRequired)?;
        let text = payload.as_text().into_owned();
        self.seen.lock().push(text.clone());
        if text.starts_with("bad") {
            return Err(HandlerError::InvalidPayload(text));
        }
        ctx.publish(egress, &payload)
    }

    fn configuration(&self) -> &Configuration {
        &self.cfg
    }

    fn validate_configuration(&mut self) -> Result<(), PropertyError> {
        self.cfg.validate()
    }

    fn set_metric_provider(&mut self, _provider: Arc<dyn MetricProvider>, _label: &str) {}
}

/// Failure sink collecting into a shared vector.
pub fn failure_sink() -> (
    impl Fn(Failure) + Send + Sync + 'static,
    Arc<Mutex<Vec<Failure>>>,
) {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    (move |failure: Failure| sink.lock().push(failure), failures)
}
