//! Stop, source close and draining of outstanding publishes.

use std::time::Duration;

use batched_publisher::broker::{Broker, InMemoryBroker};
use batched_publisher::pool::PoolClosed;
use batched_publisher::{Dispatcher, JsonSerializer};
use tokio::sync::mpsc;

use crate::support::{advance, config, event, event_names, Harness, LogCapture, PROJECT, TOPIC};

#[tokio::test(start_paused = true)]
async fn stop_flushes_open_batch_and_drains() {
    let h = Harness::start_with(config(10, 1_000, 4), JsonSerializer, |topic| {
        topic.set_ack_delay(Duration::from_millis(100));
    })
    .await;
    h.send(&["A", "B", "C"]).await;
    advance(10).await;
    assert!(h.topic.is_empty());

    let stats = h.handle.stop().await;

    assert_eq!(stats.final_flushes, 1);
    assert_eq!(stats.messages_published, 3);
    assert_eq!(stats.batches_published, 1);
    assert_eq!(event_names(&h.topic), vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_in_flight_size_flushes() {
    let h = Harness::start_with(config(2, 1_000, 4), JsonSerializer, |topic| {
        topic.set_ack_delay(Duration::from_millis(500));
    })
    .await;
    h.send(&["A", "B", "C", "D"]).await;
    advance(10).await;
    assert_eq!(h.handle.in_flight(), 2);

    let stats = h.handle.stop().await;

    assert_eq!(stats.size_flushes, 2);
    assert_eq!(stats.final_flushes, 0);
    assert_eq!(stats.messages_published, 4);
    assert_eq!(h.metrics.outcomes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn closing_the_source_ends_the_loop() {
    let h = Harness::start(config(10, 1_000, 4)).await;
    h.send(&["A", "B"]).await;
    let handle = {
        let crate::support::Harness { tx, handle, .. } = h;
        drop(tx);
        handle
    };

    let stats = handle.join().await;

    assert_eq!(stats.events_received, 2);
    assert_eq!(stats.final_flushes, 1);
    assert_eq!(stats.messages_published, 2);
}

#[tokio::test(start_paused = true)]
async fn drained_dispatcher_closes_its_pool() {
    let broker = InMemoryBroker::new();
    let dispatcher = Dispatcher::new(&broker, config(10, 1_000, 2), 0).await.unwrap();
    let pool = dispatcher.pool().clone();
    let (tx, rx) = mpsc::channel(8);
    let handle = dispatcher.spawn(rx);

    tx.send(event("A")).await.unwrap();
    drop(tx);
    let stats = handle.join().await;

    assert_eq!(stats.final_flushes, 1);
    assert_eq!(stats.messages_published, 1);
    assert_eq!(pool.submit(async {}).await, Err(PoolClosed));
}

#[tokio::test(start_paused = true)]
async fn batch_is_dropped_when_pool_refuses_work() {
    let (logs, _guard) = LogCapture::install();
    let broker = InMemoryBroker::new();
    let dispatcher = Dispatcher::new(&broker, config(2, 100, 2), 0).await.unwrap();
    dispatcher.pool().close();
    let (tx, rx) = mpsc::channel(8);
    let handle = dispatcher.spawn(rx);

    tx.send(event("A")).await.unwrap();
    tx.send(event("B")).await.unwrap();
    advance(10).await;

    assert!(broker.topic(PROJECT, TOPIC).is_empty());
    assert_eq!(logs.errors("batch dropped").len(), 1);
    let stats = handle.stats();
    assert_eq!(stats.size_flushes, 1);
    assert_eq!(stats.batches_published, 0);
    assert_eq!(handle.in_flight(), 0);

    // The timer was rearmed, so the loop keeps ticking.
    advance(150).await;
    assert!(handle.stats().empty_ticks >= 1);
}
