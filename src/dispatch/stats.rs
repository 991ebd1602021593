use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated by a dispatcher and its publish tasks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events read from the inbound source.
    pub events_received: u64,
    /// Events dropped because they could not be serialized.
    pub serialization_failures: u64,
    /// Batches flushed because they reached the maximum size.
    pub size_flushes: u64,
    /// Batches flushed because the flush deadline passed.
    pub time_flushes: u64,
    /// Partial batches flushed while stopping.
    pub final_flushes: u64,
    /// Deadlines that found an empty batch.
    pub empty_ticks: u64,
    /// Publish tasks that completed.
    pub batches_published: u64,
    /// Messages the broker accepted.
    pub messages_published: u64,
    /// Messages the broker rejected.
    pub messages_failed: u64,
}

impl DispatchStats {
    pub fn flushes(&self) -> u64 {
        self.size_flushes + self.time_flushes + self.final_flushes
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub events_received: AtomicU64,
    pub serialization_failures: AtomicU64,
    pub size_flushes: AtomicU64,
    pub time_flushes: AtomicU64,
    pub final_flushes: AtomicU64,
    pub empty_ticks: AtomicU64,
    pub batches_published: AtomicU64,
    pub messages_published: AtomicU64,
    pub messages_failed: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish(&self, succeeded: u64, failed: u64) {
        self.batches_published.fetch_add(1, Ordering::Relaxed);
        self.messages_published.fetch_add(succeeded, Ordering::Relaxed);
        self.messages_failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            events_received: self.events_received.load(Ordering::Relaxed),
            serialization_failures: self.serialization_failures.load(Ordering::Relaxed),
            size_flushes: self.size_flushes.load(Ordering::Relaxed),
            time_flushes: self.time_flushes.load(Ordering::Relaxed),
            final_flushes: self.final_flushes.load(Ordering::Relaxed),
            empty_ticks: self.empty_ticks.load(Ordering::Relaxed),
            batches_published: self.batches_published.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
        }
    }
}
