//! Serialization and per-message publish failures.

use batched_publisher::JsonSerializer;

use crate::support::{advance, config, Harness, LogCapture, RejectingSerializer};

#[tokio::test(start_paused = true)]
async fn one_rejected_message_is_counted_and_the_rest_published() {
    let h = Harness::start_with(config(4, 100, 4), JsonSerializer, |topic| {
        topic.reject_when(|m| m.attribute("event_name") == Some("B"));
    })
    .await;
    h.send(&["A", "B", "C", "D"]).await;
    advance(10).await;

    assert_eq!(h.topic.len(), 4);
    assert_eq!(h.metrics.total_succeeded(), 3);
    assert_eq!(h.metrics.total_failed(), 1);
    let stats = h.handle.stats();
    assert_eq!(stats.messages_published, 3);
    assert_eq!(stats.messages_failed, 1);
    assert_eq!(stats.batches_published, 1);
}

#[tokio::test(start_paused = true)]
async fn every_message_rejected_still_rearms_timer() {
    let h = Harness::start_with(config(2, 100, 4), JsonSerializer, |topic| {
        topic.reject_when(|_| true);
    })
    .await;
    h.send(&["A", "B", "C"]).await;
    advance(150).await;

    assert_eq!(h.topic.len(), 3);
    assert_eq!(h.metrics.total_failed(), 3);
    assert_eq!(h.handle.stats().time_flushes, 1);
}

#[tokio::test(start_paused = true)]
async fn unserializable_event_is_dropped() {
    let h = Harness::start_with(config(5, 100, 4), RejectingSerializer("B"), |_| {}).await;
    h.send(&["A", "B", "C"]).await;
    advance(150).await;

    assert_eq!(h.published_names(), vec!["A", "C"]);
    assert_eq!(h.batch_sizes(), vec![2]);
    let stats = h.handle.stats();
    assert_eq!(stats.events_received, 3);
    assert_eq!(stats.serialization_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn unserializable_event_logs_one_error() {
    let (logs, _guard) = LogCapture::install();
    let h = Harness::start_with(config(5, 100, 4), RejectingSerializer("B"), |_| {}).await;
    h.send(&["A", "B", "C"]).await;
    advance(150).await;

    let errors = logs.errors("error serializing event");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("event_name"), Some("B"));
    assert_eq!(errors[0].field("sender_id"), Some("sender-1"));
    assert!(logs.errors("error publishing message").is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_message_is_logged_with_position_and_sender() {
    let (logs, _guard) = LogCapture::install();
    let h = Harness::start_with(config(4, 100, 4), JsonSerializer, |topic| {
        topic.reject_when(|m| m.attribute("event_name") == Some("C"));
    })
    .await;
    h.send(&["A", "B", "C", "D"]).await;
    advance(10).await;

    let errors = logs.errors("error publishing message");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("index"), Some("2"));
    assert_eq!(errors[0].field("event_name"), Some("C"));
    assert_eq!(errors[0].field("sender_id"), Some("sender-1"));
    assert_eq!(errors[0].field("topic"), Some("events"));
}
