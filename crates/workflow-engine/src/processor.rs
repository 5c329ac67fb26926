//! # Processor
//!
//! The run unit pairing a handler with ingress subscriptions, egress topic
//! names and an optional execution interval.
//!
//! ## Lifecycle
//!
//! ```text
//! new(name, bus, egress) ──set_handler / subscribe / set_execution_interval──┐
//!                                                                            ↓
//!                     [STOPPED] ──start(ctx)──→ [RUNNING] ──ctx cancelled──→ [DONE]
//! ```
//!
//! `start` checks, in order: a handler is attached, a context was given,
//! the handler's configuration validates. It then spawns one task per
//! ingress topic plus one for the execution interval and returns without
//! waiting. There is no `stop`: loops end when the context is cancelled.
//!
//! ## Run Loop
//!
//! - Each delivered payload increments `<name>_<id>_payloads_in`, then
//!   `Handler::handle` runs with the payload and the egress names.
//! - Each interval tick runs `Handler::handle` without a payload.
//! - A handler error becomes a `Failure` for the failure handler; the loop
//!   keeps going.
//! - Cancellation is checked between invocations only. An invocation in
//!   flight always finishes.

use crate::config::EngineConfig;
use crate::error::{HandlerError, ProcessorError};
use crate::failure::{default_failure_handler, Failure, FailureHandler};
use crate::handler::{Handler, HandlerContext};
use crate::property::Configuration;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use workflow_bus::{Bus, Payload, TopicReceiver};
use workflow_telemetry::{payloads_in_metric, MetricProvider, PrometheusProvider};

/// Source of processor identities; the first processor gets 1.
static NEXT_PROCESSOR_ID: AtomicU64 = AtomicU64::new(1);

fn next_processor_id() -> u64 {
    NEXT_PROCESSOR_ID.fetch_add(1, Ordering::Relaxed)
}

/// A handler bound to topics.
pub struct Processor {
    id: u64,
    name: String,
    bus: Arc<Bus>,

    /// Handler waiting for `start`.
    handler: Option<Box<dyn Handler>>,
    /// Handler shared with the run loops after `start`.
    active: Option<Arc<dyn Handler>>,

    egress: Arc<[String]>,
    ingress_topics: Vec<String>,
    /// Receivers waiting for `start`; moved into the run loops.
    ingress: Vec<TopicReceiver>,

    subscriber_capacity: usize,
    subscriber_buffer_capacity: usize,
    execution_interval: Duration,

    metric: Arc<dyn MetricProvider>,
    failure_handler: FailureHandler,

    token: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

impl Processor {
    /// Create a processor publishing to `egress`, with default sizing.
    pub fn new(name: impl Into<String>, bus: Arc<Bus>, egress: &[&str]) -> Self {
        Self::with_config(name, bus, egress, &EngineConfig::default())
    }

    /// Create a processor using the subscriber sizing from `config`.
    pub fn with_config(
        name: impl Into<String>,
        bus: Arc<Bus>,
        egress: &[&str],
        config: &EngineConfig,
    ) -> Self {
        Self {
            id: next_processor_id(),
            name: name.into(),
            bus,
            handler: None,
            active: None,
            egress: egress.iter().map(|s| s.to_string()).collect(),
            ingress_topics: Vec::new(),
            ingress: Vec::new(),
            subscriber_capacity: config.subscriber_capacity,
            subscriber_buffer_capacity: config.subscriber_buffer_capacity,
            execution_interval: Duration::ZERO,
            metric: Arc::new(PrometheusProvider::new()),
            failure_handler: default_failure_handler(),
            token: None,
            tasks: Vec::new(),
        }
    }

    /// Process unique identity.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>_<id>`, the label handed to the handler's metric provider.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}_{}", self.name, self.id)
    }

    /// Name of the incoming payload counter.
    #[must_use]
    pub fn payloads_in_metric(&self) -> String {
        payloads_in_metric(&self.label())
    }

    #[must_use]
    pub fn egress(&self) -> &[String] {
        &self.egress
    }

    #[must_use]
    pub fn ingress_topics(&self) -> &[String] {
        &self.ingress_topics
    }

    #[must_use]
    pub fn execution_interval(&self) -> Duration {
        self.execution_interval
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Attach (or replace) the handler. Has no effect on a running processor.
    pub fn set_handler<H: Handler + 'static>(&mut self, handler: H) {
        self.set_boxed_handler(Box::new(handler));
    }

    pub fn set_boxed_handler(&mut self, handler: Box<dyn Handler>) {
        if self.is_started() {
            warn!(processor = %self.name, processor_id = self.id, "Handler change ignored, processor already started");
            return;
        }
        self.handler = Some(handler);
    }

    /// The handler's configuration, if a handler is attached.
    #[must_use]
    pub fn configuration(&self) -> Option<&Configuration> {
        match (&self.handler, &self.active) {
            (Some(handler), _) => Some(handler.configuration()),
            (None, Some(active)) => Some(active.configuration()),
            (None, None) => None,
        }
    }

    /// Subscribe to topics using the configured subscriber sizing.
    pub fn subscribe(&mut self, topics: &[&str]) -> Result<(), ProcessorError> {
        for topic in topics {
            self.subscribe_with(topic, self.subscriber_capacity, self.subscriber_buffer_capacity)?;
        }
        Ok(())
    }

    /// Subscribe to one topic with explicit direct and buffer capacities.
    pub fn subscribe_with(
        &mut self,
        topic: &str,
        direct_capacity: usize,
        buffer_capacity: usize,
    ) -> Result<(), ProcessorError> {
        if self.is_started() {
            return Err(ProcessorError::AlreadyRunning(self.id));
        }
        let receiver = self.bus.subscribe(topic, direct_capacity, buffer_capacity)?;
        debug!(processor = %self.name, processor_id = self.id, topic, "Processor subscribed");
        self.ingress_topics.push(topic.to_string());
        self.ingress.push(receiver);
        Ok(())
    }

    /// Fire the handler every `interval` in addition to ingress deliveries.
    /// Zero disables the timer.
    pub fn set_execution_interval(&mut self, interval: Duration) {
        self.execution_interval = interval;
    }

    /// Replace the metric provider. Has no effect after `start`.
    pub fn set_metric_provider(&mut self, provider: Arc<dyn MetricProvider>) {
        if !self.is_started() {
            self.metric = provider;
        }
    }

    #[must_use]
    pub fn metric(&self) -> &Arc<dyn MetricProvider> {
        &self.metric
    }

    /// Replace the failure handler. Has no effect after `start`.
    pub fn set_failure_handler<F>(&mut self, handler: F)
    where
        F: Fn(Failure) + Send + Sync + 'static,
    {
        if !self.is_started() {
            self.failure_handler = Arc::new(handler);
        }
    }

    fn is_started(&self) -> bool {
        self.token.is_some()
    }

    /// Whether the run loops are live: started and not yet cancelled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Validate preconditions and launch the run loops.
    ///
    /// `ctx` is the cancellation token governing the loops; `None` is
    /// rejected. Returns immediately after spawning.
    pub fn start(&mut self, ctx: Option<CancellationToken>) -> Result<(), ProcessorError> {
        if self.is_started() {
            return Err(ProcessorError::AlreadyRunning(self.id));
        }
        let label = self.label();
        let in_metric = payloads_in_metric(&label);

        let handler = self
            .handler
            .as_mut()
            .ok_or(ProcessorError::NoHandlerApplied)?;
        let token = ctx.ok_or(ProcessorError::NilContext)?;
        handler
            .validate_configuration()
            .map_err(ProcessorError::RequiredPropertiesNotFulfilled)?;

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ProcessorError::NoRuntime)?;

        self.metric
            .add_metric(&in_metric, "Payloads delivered to the processor")?;
        handler.set_metric_provider(Arc::clone(&self.metric), &label);

        let handler: Arc<dyn Handler> = match self.handler.take() {
            Some(handler) => Arc::from(handler),
            None => return Err(ProcessorError::NoHandlerApplied),
        };

        let run_loop = Arc::new(RunLoop {
            processor_id: self.id,
            processor_name: self.name.clone(),
            handler: Arc::clone(&handler),
            egress: Arc::clone(&self.egress),
            metric: Arc::clone(&self.metric),
            in_metric,
            failure_handler: Arc::clone(&self.failure_handler),
            ctx: HandlerContext::new(
                Arc::clone(&self.bus),
                token.clone(),
                self.id,
                self.name.as_str(),
            ),
        });

        for receiver in self.ingress.drain(..) {
            let run_loop = Arc::clone(&run_loop);
            self.tasks.push(runtime.spawn(run_loop.run_ingress(receiver)));
        }
        if !self.execution_interval.is_zero() {
            let run_loop = Arc::clone(&run_loop);
            self.tasks
                .push(runtime.spawn(run_loop.run_timer(self.execution_interval)));
        }

        info!(
            processor = %self.name,
            processor_id = self.id,
            handler = handler.name(),
            ingress = ?self.ingress_topics,
            egress = ?self.egress,
            interval_ms = self.execution_interval.as_millis() as u64,
            "Processor started"
        );

        self.active = Some(handler);
        self.token = Some(token);
        Ok(())
    }

    /// Wait for every run loop to exit (after the context is cancelled).
    pub async fn join(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(processor = %self.name, processor_id = self.id, error = %e, "Run loop panicked");
            }
        }
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("ingress", &self.ingress_topics)
            .field("egress", &self.egress)
            .field("execution_interval", &self.execution_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

/// State shared by all run loops of one started processor.
struct RunLoop {
    processor_id: u64,
    processor_name: String,
    handler: Arc<dyn Handler>,
    egress: Arc<[String]>,
    metric: Arc<dyn MetricProvider>,
    in_metric: String,
    failure_handler: FailureHandler,
    ctx: HandlerContext,
}

impl RunLoop {
    async fn invoke(&self, payload: Option<Payload>) {
        if payload.is_some() {
            if let Err(e) = self.metric.inc_metric(&self.in_metric, 1.0) {
                warn!(processor_id = self.processor_id, error = %e, "Failed to count payload");
            }
        }

        let result = self
            .handler
            .handle(&self.ctx, payload.clone(), &self.egress)
            .await;

        if let Err(error) = result {
            self.fail(error, payload);
        }
    }

    fn fail(&self, error: HandlerError, payload: Option<Payload>) {
        (self.failure_handler)(Failure::new(error, self.processor_id, payload));
    }

    async fn run_ingress(self: Arc<Self>, receiver: TopicReceiver) {
        let token = self.ctx.token().clone();
        debug!(processor = %self.processor_name, processor_id = self.processor_id, topic = receiver.topic(), "Ingress loop started");

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                next = receiver.recv() => match next {
                    Some(payload) => self.invoke(Some(payload)).await,
                    None => break,
                },
            }
        }

        info!(processor = %self.processor_name, processor_id = self.processor_id, topic = receiver.topic(), "Ingress loop stopped");
    }

    async fn run_timer(self: Arc<Self>, period: Duration) {
        let token = self.ctx.token().clone();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = ticker.tick() => self.invoke(None).await,
            }
        }

        info!(processor = %self.processor_name, processor_id = self.processor_id, "Timer loop stopped");
    }
}
