//! Size-triggered flushes.

use crate::support::{advance, config, Harness};

#[tokio::test(start_paused = true)]
async fn below_max_size_nothing_is_published() {
    let h = Harness::start(config(5, 100, 4)).await;
    h.send(&["A", "B", "C", "D"]).await;
    advance(50).await;

    assert!(h.topic.is_empty());
    assert!(h.metrics.outcomes().is_empty());
    assert_eq!(h.handle.stats().events_received, 4);
}

#[tokio::test(start_paused = true)]
async fn full_batch_is_published_once_in_order() {
    let h = Harness::start(config(3, 100, 4)).await;
    h.send(&["A", "B", "C"]).await;
    advance(10).await;

    assert_eq!(h.published_names(), vec!["A", "B", "C"]);
    assert_eq!(h.batch_sizes(), vec![3]);
    let stats = h.handle.stats();
    assert_eq!(stats.size_flushes, 1);
    assert_eq!(stats.time_flushes, 0);
    assert_eq!(stats.messages_published, 3);
}

#[tokio::test(start_paused = true)]
async fn every_event_lands_in_exactly_one_batch() {
    let h = Harness::start(config(2, 100, 4)).await;
    h.send(&["A", "B", "C", "D", "E"]).await;
    advance(150).await;

    assert_eq!(h.published_names(), vec!["A", "B", "C", "D", "E"]);
    assert_eq!(h.batch_sizes(), vec![2, 2, 1]);
    let stats = h.handle.stats();
    assert_eq!(stats.size_flushes, 2);
    assert_eq!(stats.time_flushes, 1);
}

#[tokio::test(start_paused = true)]
async fn size_flush_resets_the_flush_clock() {
    let h = Harness::start(config(2, 100, 4)).await;

    advance(80).await;
    h.send(&["A", "B"]).await;
    advance(10).await;
    h.send(&["C"]).await;

    // The original deadline at 100ms was replaced when the size flush finished.
    advance(60).await;
    assert_eq!(h.published_names(), vec!["A", "B"]);

    advance(60).await;
    assert_eq!(h.published_names(), vec!["A", "B", "C"]);
    assert_eq!(h.handle.stats().time_flushes, 1);
}
