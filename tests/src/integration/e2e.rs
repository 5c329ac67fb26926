//! # Processor to Processor
//!
//! ```text
//! sender (timer, no ingress) ──"testtopic"────────→ printer
//!                            └─"topicthatbuffers"─→ [buffer] ──drain──→ printer2
//! ```
//!
//! The printers count deliveries in `<name>_<id>_payloads_in`.

#[cfg(test)]
mod tests {
    use crate::integration::support::{init_test_tracing, wait_until, OneShotSender};
    use std::sync::Arc;
    use std::time::Duration;
    use workflow_bus::{Bus, Payload};
    use workflow_engine::{CancellationToken, Processor, Workflow, EngineConfig};
    use workflow_handlers::StdoutHandler;
    use workflow_telemetry::PrometheusProvider;

    fn payloads_in(p: &Processor) -> f64 {
        p.metric()
            .get_metric(&p.payloads_in_metric())
            .map_or(0.0, |m| m.value)
    }

    #[tokio::test]
    async fn test_pubsub_between_processors() {
        init_test_tracing();
        let bus = Arc::new(Bus::new());
        let token = CancellationToken::new();

        let mut sender = Processor::new("sender", Arc::clone(&bus), &["testtopic"]);
        sender.set_handler(OneShotSender::new(Payload::new("Test", "Hello world")));
        sender.set_execution_interval(Duration::from_millis(10));

        let mut printer = Processor::new("printer", Arc::clone(&bus), &[]);
        printer.set_handler(StdoutHandler::new());
        printer.subscribe(&["testtopic"]).unwrap();

        printer.start(Some(token.clone())).unwrap();
        sender.start(Some(token.clone())).unwrap();

        assert!(wait_until(Duration::from_secs(2), || payloads_in(&printer) >= 1.0).await);
        // The sender fires once; give a stray second delivery time to show up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(payloads_in(&printer), 1.0);
        assert_eq!(
            printer.payloads_in_metric(),
            format!("printer_{}_payloads_in", printer.id())
        );

        token.cancel();
        sender.join().await;
        printer.join().await;
    }

    #[tokio::test]
    async fn test_buffered_topic_delivers_after_drain() {
        init_test_tracing();
        let bus = Arc::new(Bus::new());
        let token = CancellationToken::new();

        let mut sender = Processor::new(
            "sender",
            Arc::clone(&bus),
            &["testtopic", "topicthatbuffers"],
        );
        sender.set_handler(OneShotSender::new(Payload::new("Test", "Hello world")));
        sender.set_execution_interval(Duration::from_millis(10));

        let mut printer = Processor::new("printer", Arc::clone(&bus), &[]);
        printer.set_handler(StdoutHandler::new());
        printer.subscribe(&["testtopic"]).unwrap();

        printer.start(Some(token.clone())).unwrap();
        sender.start(Some(token.clone())).unwrap();

        assert!(wait_until(Duration::from_secs(2), || payloads_in(&printer) >= 1.0).await);
        assert_eq!(bus.buffer_len("topicthatbuffers"), 1);

        let mut printer2 = Processor::new("printer2", Arc::clone(&bus), &[]);
        printer2.set_handler(StdoutHandler::new());
        printer2.set_metric_provider(Arc::new(PrometheusProvider::new()));
        printer2.subscribe(&["topicthatbuffers"]).unwrap();
        printer2.start(Some(token.clone())).unwrap();

        // Subscribing alone does not release buffered payloads.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(payloads_in(&printer2), 0.0);
        assert_eq!(bus.buffer_len("topicthatbuffers"), 1);

        assert_eq!(bus.drain_topics_buffer(), 1);
        assert!(wait_until(Duration::from_secs(2), || payloads_in(&printer2) >= 1.0).await);
        assert_eq!(payloads_in(&printer2), 1.0);
        assert_eq!(bus.buffer_len("topicthatbuffers"), 0);

        token.cancel();
        for p in [&mut sender, &mut printer, &mut printer2] {
            p.join().await;
        }
    }

    #[tokio::test]
    async fn test_forwarding_chain_in_workflow() {
        init_test_tracing();
        let mut workflow = Workflow::new(EngineConfig::default());

        let mut sender = workflow.processor("sender", &["print_stdout"]);
        sender.set_handler(OneShotSender::new(Payload::new("Test", "relay")));
        sender.set_execution_interval(Duration::from_millis(10));

        let mut printer = workflow.processor("printer", &["printer_output"]);
        printer.set_handler(StdoutHandler::new());
        printer
            .configuration()
            .unwrap()
            .set_property("forward", true)
            .unwrap();
        printer.subscribe(&["print_stdout"]).unwrap();

        let mut printer2 = workflow.processor("printer2", &[]);
        printer2.set_handler(StdoutHandler::new());
        printer2.subscribe(&["printer_output"]).unwrap();

        workflow.add(sender);
        workflow.add(printer);
        workflow.add(printer2);
        workflow.start().unwrap();

        let last = workflow.find("printer2").unwrap();
        assert!(wait_until(Duration::from_secs(2), || payloads_in(last) >= 1.0).await);

        let printer = workflow.find("printer").unwrap();
        let out = format!("printer_{}_payloads_out", printer.id());
        assert_eq!(printer.metric().get_metric(&out).unwrap().value, 1.0);

        workflow.shutdown().await;
    }
}
