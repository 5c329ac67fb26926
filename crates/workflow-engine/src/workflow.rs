//! # Workflow
//!
//! Owns a bus, a set of processors and the context that governs them.
//!
//! ## Startup Sequence
//!
//! 1. Build processors with `Workflow::processor` and register them with `add`
//! 2. `start` starts every processor in registration order
//! 3. If `drain_interval_ms` is configured, a periodic buffer drain is spawned
//! 4. `shutdown` cancels the shared context and waits for every run loop

use crate::config::EngineConfig;
use crate::error::ProcessorError;
use crate::processor::Processor;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use workflow_bus::Bus;

/// A pipeline of processors sharing one bus and one cancellation context.
pub struct Workflow {
    bus: Arc<Bus>,
    config: EngineConfig,
    processors: Vec<Processor>,
    token: CancellationToken,
    drain_task: Option<JoinHandle<()>>,
}

impl Workflow {
    /// Create an empty workflow with its own bus.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        info!(
            topic_buffer_capacity = config.topic_buffer_capacity,
            subscriber_capacity = config.subscriber_capacity,
            "Creating workflow"
        );
        Self {
            bus: Arc::new(Bus::with_buffer_capacity(config.topic_buffer_capacity)),
            config,
            processors: Vec::new(),
            token: CancellationToken::new(),
            drain_task: None,
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The context shared by every processor; cancel it to stop the pipeline.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// A new processor on this workflow's bus, sized by its configuration.
    #[must_use]
    pub fn processor(&self, name: &str, egress: &[&str]) -> Processor {
        Processor::with_config(name, Arc::clone(&self.bus), egress, &self.config)
    }

    /// Register a processor; returns its id.
    pub fn add(&mut self, processor: Processor) -> u64 {
        let id = processor.id();
        self.processors.push(processor);
        id
    }

    #[must_use]
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Find a registered processor by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Processor> {
        self.processors.iter().find(|p| p.name() == name)
    }

    /// Start every registered processor.
    ///
    /// On the first failure the shared context is cancelled, so processors
    /// that already started wind down, and the error names the offender.
    pub fn start(&mut self) -> Result<(), ProcessorError> {
        for processor in &mut self.processors {
            if let Err(e) = processor.start(Some(self.token.clone())) {
                error!(processor = processor.name(), error = %e, "Processor failed to start");
                self.token.cancel();
                return Err(ProcessorError::Start {
                    processor: processor.name().to_string(),
                    source: Box::new(e),
                });
            }
        }

        if let Some(period) = self.config.drain_interval() {
            self.drain_task = Some(self.bus.spawn_periodic_drain(period, self.token.clone()));
        }

        info!(processors = self.processors.len(), "Workflow started");
        Ok(())
    }

    /// Drain every topic buffer once.
    pub fn drain(&self) -> usize {
        self.bus.drain_topics_buffer()
    }

    /// Cancel the context and wait for all run loops to finish.
    pub async fn shutdown(&mut self) {
        info!("Initiating workflow shutdown...");
        self.token.cancel();

        for processor in &mut self.processors {
            processor.join().await;
        }
        if let Some(task) = self.drain_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Drain task panicked");
            }
        }

        info!("Workflow shutdown complete");
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("config", &self.config)
            .field("processors", &self.processors)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
