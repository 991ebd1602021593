//! Observability port for publish attempts.
//!
//! The dispatcher reports through `PublishMetrics` and never owns a global
//! registry. `MetricsRecorder` forwards to the `metrics` facade, so whichever
//! exporter the host process installs (Prometheus, StatsD, ...) picks the
//! numbers up. `RecordingMetrics` keeps everything in memory.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Label value for publish-task measurements.
pub const FUNCTION_PUBLISH: &str = "publish";

pub trait PublishMetrics: Send + Sync {
    /// One publish attempt finished with the given per-message counts.
    fn record_outcome(&self, function: &'static str, succeeded: u64, failed: u64);

    /// Wall time of one publish attempt.
    fn record_duration(&self, function: &'static str, elapsed: Duration);
}

impl<M: PublishMetrics + ?Sized> PublishMetrics for Arc<M> {
    fn record_outcome(&self, function: &'static str, succeeded: u64, failed: u64) {
        (**self).record_outcome(function, succeeded, failed)
    }

    fn record_duration(&self, function: &'static str, elapsed: Duration) {
        (**self).record_duration(function, elapsed)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl PublishMetrics for NoopMetrics {
    fn record_outcome(&self, _function: &'static str, _succeeded: u64, _failed: u64) {}

    fn record_duration(&self, _function: &'static str, _elapsed: Duration) {}
}

/// Forwards to the `metrics` crate macros.
///
/// - `publisher_publish_total{function}` - every submitted message
/// - `publisher_publish_failures_total{function}` - rejected messages
/// - `publisher_publish_duration_ms{function}` - histogram per attempt
#[cfg(feature = "metrics")]
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsRecorder;

#[cfg(feature = "metrics")]
impl PublishMetrics for MetricsRecorder {
    fn record_outcome(&self, function: &'static str, succeeded: u64, failed: u64) {
        ::metrics::counter!("publisher_publish_total", "function" => function)
            .increment(succeeded + failed);
        ::metrics::counter!("publisher_publish_failures_total", "function" => function)
            .increment(failed);
    }

    fn record_duration(&self, function: &'static str, elapsed: Duration) {
        ::metrics::histogram!("publisher_publish_duration_ms", "function" => function)
            .record(elapsed.as_secs_f64() * 1000.0);
    }
}

/// One recorded publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedOutcome {
    pub function: &'static str,
    pub succeeded: u64,
    pub failed: u64,
}

/// Keeps every report in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingMetrics {
    outcomes: Arc<Mutex<Vec<RecordedOutcome>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<RecordedOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.durations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn total_succeeded(&self) -> u64 {
        self.outcomes().iter().map(|o| o.succeeded).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.outcomes().iter().map(|o| o.failed).sum()
    }
}

impl PublishMetrics for RecordingMetrics {
    fn record_outcome(&self, function: &'static str, succeeded: u64, failed: u64) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedOutcome {
                function,
                succeeded,
                failed,
            });
    }

    fn record_duration(&self, _function: &'static str, elapsed: Duration) {
        self.durations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(elapsed);
    }
}
