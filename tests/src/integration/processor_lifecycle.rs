//! # Processor Lifecycle
//!
//! Identity assignment, start preconditions, and failure isolation inside
//! the run loop, exercised with the bundled handlers.

#[cfg(test)]
mod tests {
    use crate::integration::support::{failure_sink, init_test_tracing, wait_until, Recorder};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use workflow_bus::{Bus, Payload};
    use workflow_engine::{
        CancellationToken, HandlerError, Processor, ProcessorError, PropertyError,
    };
    use workflow_handlers::{as_handlers_error, HandlersError, MapFilterHandler, ReadFileHandler};

    #[test]
    fn test_identity_unique_across_threads() {
        let bus = Arc::new(Bus::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bus = Arc::clone(&bus);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| Processor::new("worker", Arc::clone(&bus), &[]).id())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(id >= 1);
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 1000);
    }

    #[tokio::test]
    async fn test_start_preconditions() {
        init_test_tracing();
        let bus = Arc::new(Bus::new());
        let mut reader = Processor::new("readfile", bus, &["file_data"]);

        assert!(matches!(reader.start(None), Err(ProcessorError::NoHandlerApplied)));
        assert!(matches!(
            reader.start(Some(CancellationToken::new())),
            Err(ProcessorError::NoHandlerApplied)
        ));

        reader.set_handler(ReadFileHandler::new());
        assert!(matches!(reader.start(None), Err(ProcessorError::NilContext)));

        let token = CancellationToken::new();
        match reader.start(Some(token.clone())) {
            Err(ProcessorError::RequiredPropertiesNotFulfilled(PropertyError::MissingRequired(
                missing,
            ))) => assert_eq!(missing, vec!["remove_after".to_string()]),
            other => panic!("unexpected result: {:?}", other),
        }

        reader
            .configuration()
            .unwrap()
            .set_property("remove_after", false)
            .unwrap();
        reader.start(Some(token.clone())).unwrap();
        assert!(reader.is_running());

        token.cancel();
        reader.join().await;
        assert!(!reader.is_running());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_next_payload() {
        init_test_tracing();
        let bus = Arc::new(Bus::new());
        let downstream = bus.subscribe("passed", 8, 0).unwrap();

        let mut filter = Processor::new("mapfilter", Arc::clone(&bus), &["passed"]);
        filter.set_handler(MapFilterHandler::new());
        let filters: std::collections::HashMap<String, String> =
            [("username".to_string(), "perbol".to_string())].into();
        filter
            .configuration()
            .unwrap()
            .set_property("filters", filters)
            .unwrap();
        filter.subscribe(&["rows"]).unwrap();

        let (sink, failures) = failure_sink();
        filter.set_failure_handler(sink);

        let token = CancellationToken::new();
        filter.start(Some(token.clone())).unwrap();

        bus.publish_one("rows", Payload::new("test", "NotAJSONMAP")).unwrap();
        bus.publish_one("rows", Payload::new("test", r#"{"username":"perbol"}"#))
            .unwrap();

        assert!(wait_until(Duration::from_secs(2), || downstream.try_recv().ok().flatten().is_some()).await);

        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].processor(), filter.id());
        assert_eq!(
            as_handlers_error(failures[0].error()),
            Some(&HandlersError::NotJsonMap)
        );
        assert_eq!(failures[0].payload().unwrap().as_text(), "NotAJSONMAP");
        drop(failures);

        token.cancel();
        filter.join().await;
    }

    #[tokio::test]
    async fn test_timer_without_ingress_reports_failure() {
        init_test_tracing();
        let bus = Arc::new(Bus::new());
        let mut p = Processor::new("lonely", bus, &[]);
        let (recorder, seen) = Recorder::new();
        p.set_handler(recorder);
        p.set_execution_interval(Duration::from_millis(10));

        let (sink, failures) = failure_sink();
        p.set_failure_handler(sink);

        let token = CancellationToken::new();
        p.start(Some(token.clone())).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !failures.lock().is_empty()).await);

        {
            let failures = failures.lock();
            assert!(matches!(failures[0].error(), HandlerError::IngressRequired));
            assert!(failures[0].payload().is_none());
            assert!(failures[0].to_string().ends_with("with no payload attached"));
        }
        assert!(seen.lock().is_empty());

        token.cancel();
        p.join().await;
    }
}
