//! # Bus Delivery
//!
//! Direct delivery order, backpressure on unbuffered topics, and buffered
//! overflow released by an explicit drain.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::time::timeout;
    use workflow_bus::{Bus, BusError, Delivery, Payload};

    fn payload(text: &str) -> Payload {
        Payload::new("pubsub", text.to_string())
    }

    #[tokio::test]
    async fn test_delivers_once_in_publish_order() {
        let bus = Bus::new();
        let rx = bus.subscribe("orders", 16, 0).unwrap();

        for i in 0..10 {
            let errors = bus.publish(&["orders"], &payload(&i.to_string()));
            assert!(errors.is_empty());
        }

        for i in 0..10 {
            let got = timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got.as_text(), i.to_string());
        }
        assert!(rx.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_full_unbuffered_topic_errors_without_blocking() {
        let bus = Bus::new();
        let _rx = bus.subscribe("narrow", 1, 0).unwrap();
        assert!(bus.publish(&["narrow"], &payload("first")).is_empty());

        let started = Instant::now();
        let errors = bus.publish(&["narrow"], &payload("second"));
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(
            errors,
            vec![BusError::TopicFull {
                topic: "narrow".to_string()
            }]
        );
        assert_eq!(bus.stats().dropped, 1);
    }

    #[test]
    fn test_fan_out_errors_are_per_topic() {
        let bus = Bus::new();
        let _full = bus.subscribe("full", 1, 0).unwrap();
        let open = bus.subscribe("open", 4, 0).unwrap();
        bus.publish_one("full", payload("fill")).unwrap();

        let errors = bus.publish(&["full", "open"], &payload("both"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].topic(), Some("full"));
        assert_eq!(open.try_recv().unwrap().unwrap().as_text(), "both");
    }

    #[tokio::test]
    async fn test_buffered_overflow_drains_fifo() {
        let bus = Bus::new();
        let rx = bus.subscribe("spill", 1, 8).unwrap();

        assert_eq!(bus.publish_one("spill", payload("a")).unwrap(), Delivery::Direct);
        assert_eq!(bus.publish_one("spill", payload("b")).unwrap(), Delivery::Buffered);
        assert_eq!(bus.publish_one("spill", payload("c")).unwrap(), Delivery::Buffered);
        assert_eq!(bus.buffer_len("spill"), 2);

        // No space yet: nothing moves.
        assert_eq!(bus.drain_topics_buffer(), 0);

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(rx.recv().await.unwrap().as_text().into_owned());
            bus.drain_topics_buffer();
        }
        assert_eq!(received, vec!["a", "b", "c"]);
        assert_eq!(bus.buffer_len("spill"), 0);
    }

    #[test]
    fn test_full_buffer_errors() {
        let bus = Bus::new();
        let _rx = bus.subscribe("tiny", 1, 1).unwrap();
        bus.publish_one("tiny", payload("direct")).unwrap();
        bus.publish_one("tiny", payload("buffered")).unwrap();

        assert_eq!(
            bus.publish_one("tiny", payload("overflow")),
            Err(BusError::BufferFull {
                topic: "tiny".to_string(),
                capacity: 1
            })
        );
    }

    #[test]
    fn test_later_subscriber_does_not_resize() {
        let bus = Bus::new();
        let _first = bus.subscribe("shared", 2, 0).unwrap();
        let _second = bus.subscribe("shared", 50, 0).unwrap();

        assert_eq!(bus.topic("shared").unwrap().direct_capacity(), Some(2));
        assert_eq!(bus.subscriber_count("shared"), 2);
    }

    #[tokio::test]
    async fn test_competing_subscribers_each_payload_once() {
        let bus = Arc::new(Bus::new());
        let a = bus.subscribe("work", 64, 0).unwrap();
        let b = bus.subscribe("work", 64, 0).unwrap();

        for i in 0..20 {
            bus.publish_one("work", payload(&i.to_string())).unwrap();
        }

        let mut seen = Vec::new();
        while let Ok(Some(p)) = a.try_recv() {
            seen.push(p.as_text().into_owned());
        }
        while let Ok(Some(p)) = b.try_recv() {
            seen.push(p.as_text().into_owned());
        }
        seen.sort_by_key(|s| s.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
    }
}
