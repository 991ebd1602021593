//! Publish task: the unit of work run on the worker pool.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info};

use super::batch::Batch;
use super::in_flight::InFlightGuard;
use super::stats::StatsCounters;
use super::timer::FlushTimer;
use crate::broker::{OutcomeHandle, Topic, ATTR_EVENT_NAME, ATTR_SENDER_ID};
use crate::metrics::{PublishMetrics, FUNCTION_PUBLISH};

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Time,
    Final,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushTrigger::Size => write!(f, "size"),
            FlushTrigger::Time => write!(f, "time"),
            FlushTrigger::Final => write!(f, "final"),
        }
    }
}

/// Result of publishing one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    /// Messages submitted to the broker
    pub total: u64,
    /// Messages the broker rejected
    pub failed: u64,
}

impl PublishSummary {
    pub fn succeeded(&self) -> u64 {
        self.total - self.failed
    }
}

/// Publish every message of `batch` and reconcile the outcomes.
///
/// All messages are handed to the topic back-to-back before any outcome is
/// awaited. Outcomes are then awaited in submission order. A rejected
/// message is logged with its position and sender attributes and counted;
/// it never stops the rest of the batch.
pub async fn publish_batch<T>(topic: &T, batch: Batch) -> PublishSummary
where
    T: Topic + ?Sized,
{
    let pending: Vec<(OutcomeHandle, MessageLabel)> = batch
        .into_messages()
        .into_iter()
        .map(|message| {
            let label = MessageLabel {
                sender_id: message.attribute(ATTR_SENDER_ID).unwrap_or_default().to_string(),
                event_name: message.attribute(ATTR_EVENT_NAME).unwrap_or_default().to_string(),
            };
            (topic.publish(message), label)
        })
        .collect();

    let mut summary = PublishSummary::default();
    for (index, (handle, label)) in pending.into_iter().enumerate() {
        summary.total += 1;
        if let Err(err) = handle.get().await {
            summary.failed += 1;
            error!(
                topic = topic.name(),
                index,
                sender_id = label.sender_id.as_str(),
                event_name = label.event_name.as_str(),
                error = %err,
                "error publishing message"
            );
        }
    }
    summary
}

struct MessageLabel {
    sender_id: String,
    event_name: String,
}

pub(crate) struct PublishTask<T: ?Sized> {
    pub dispatcher_id: usize,
    pub trigger: FlushTrigger,
    pub batch: Batch,
    pub topic: Arc<T>,
    pub timer: Arc<FlushTimer>,
    pub metrics: Arc<dyn PublishMetrics>,
    pub stats: Arc<StatsCounters>,
    pub in_flight: InFlightGuard,
}

impl<T: Topic + ?Sized> PublishTask<T> {
    pub async fn run(self) -> PublishSummary {
        let started = Instant::now();
        let summary = publish_batch(&*self.topic, self.batch).await;
        let elapsed = started.elapsed();

        self.metrics.record_duration(FUNCTION_PUBLISH, elapsed);
        self.metrics
            .record_outcome(FUNCTION_PUBLISH, summary.succeeded(), summary.failed);
        self.stats.record_publish(summary.succeeded(), summary.failed);
        info!(
            dispatcher_id = self.dispatcher_id,
            trigger = %self.trigger,
            success = summary.succeeded(),
            failures = summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "published batch"
        );

        self.timer.reset();
        drop(self.in_flight);
        summary
    }
}
