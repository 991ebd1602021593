//! The dispatch loop.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::batch::Batch;
use super::in_flight::InFlight;
use super::stats::{DispatchStats, StatsCounters};
use super::task::{FlushTrigger, PublishTask};
use super::timer::FlushTimer;
use crate::broker::{ensure_topic, Broker, SerializedMessage, Topic};
use crate::config::PublisherConfig;
use crate::error::DispatcherError;
use crate::event::{EventSerializer, InboundEvent, JsonSerializer};
use crate::metrics::{NoopMetrics, PublishMetrics};
use crate::pool::WorkerPool;

/// Accumulates inbound events into batches and hands full or overdue
/// batches to publish tasks on a bounded worker pool.
///
/// ## Example
///
/// ```ignore
/// let broker = InMemoryBroker::new();
/// let config = PublisherConfig::from_env()?;
/// let (tx, rx) = tokio::sync::mpsc::channel(1024);
///
/// let dispatcher = Dispatcher::new(&broker, config, 0).await?
///     .with_metrics(MetricsRecorder);
/// let handle = dispatcher.spawn(rx);
///
/// // ... upstream pushes InboundEvents into tx ...
///
/// let stats = handle.stop().await;
/// println!("published {} messages", stats.messages_published);
/// ```
pub struct Dispatcher<T, S = JsonSerializer> {
    id: usize,
    config: PublisherConfig,
    topic: Arc<T>,
    serializer: S,
    pool: WorkerPool,
    timer: Arc<FlushTimer>,
    metrics: Arc<dyn PublishMetrics>,
    in_flight: InFlight,
    stats: Arc<StatsCounters>,
}

impl<T: Topic> Dispatcher<T, JsonSerializer> {
    /// Validate the config and get-or-create the topic.
    pub async fn new<B>(
        broker: &B,
        config: PublisherConfig,
        id: usize,
    ) -> Result<Self, DispatcherError>
    where
        B: Broker<Topic = T> + ?Sized,
    {
        debug!(dispatcher_id = id, "creating dispatcher");
        config.validate()?;
        let topic = ensure_topic(broker, &config.project_id, &config.topic).await?;
        Ok(Self::with_topic(topic, config, id))
    }

    /// Build around an already provisioned topic.
    pub fn with_topic(topic: T, config: PublisherConfig, id: usize) -> Self {
        let pool = WorkerPool::new(config.max_workers, config.worker_idle_timeout);
        let timer = Arc::new(FlushTimer::new(config.max_flush_delay));
        Self {
            id,
            config,
            topic: Arc::new(topic),
            serializer: JsonSerializer,
            pool,
            timer,
            metrics: Arc::new(NoopMetrics),
            in_flight: InFlight::new(),
            stats: Arc::new(StatsCounters::default()),
        }
    }
}

impl<T: Topic, S: EventSerializer + 'static> Dispatcher<T, S> {
    pub fn with_serializer<S2: EventSerializer + 'static>(self, serializer: S2) -> Dispatcher<T, S2> {
        Dispatcher {
            id: self.id,
            config: self.config,
            topic: self.topic,
            serializer,
            pool: self.pool,
            timer: self.timer,
            metrics: self.metrics,
            in_flight: self.in_flight,
            stats: self.stats,
        }
    }

    pub fn with_metrics<M: PublishMetrics + 'static>(mut self, metrics: M) -> Self {
        self.metrics = Arc::new(metrics);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn topic(&self) -> &T {
        &self.topic
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Tracker for publish tasks that have not finished yet.
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats.snapshot()
    }

    /// Run until the inbound source closes, then flush and drain.
    pub async fn run(self, events: mpsc::Receiver<InboundEvent>) -> DispatchStats {
        self.run_until(events, std::future::pending::<()>()).await
    }

    /// Run until the inbound source closes or `shutdown` resolves.
    ///
    /// On exit the open batch is flushed, the pool is closed to further work,
    /// and every outstanding publish task is awaited before the stats are
    /// returned.
    pub async fn run_until<F>(
        self,
        mut events: mpsc::Receiver<InboundEvent>,
        shutdown: F,
    ) -> DispatchStats
    where
        F: Future<Output = ()>,
    {
        debug!(dispatcher_id = self.id, "starting dispatch loop");
        let mut batch = Batch::with_capacity(self.config.max_batch_size);
        self.timer.reset();
        tokio::pin!(shutdown);

        loop {
            let deadline = self.timer.deadline();
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(dispatcher_id = self.id, "stop requested");
                    break;
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.timer.fire_if_due(Instant::now()) {
                        self.on_deadline(&mut batch).await;
                    }
                }
                event = events.recv() => match event {
                    Some(event) => self.on_event(event, &mut batch).await,
                    None => {
                        info!(dispatcher_id = self.id, "inbound source closed");
                        break;
                    }
                },
                _ = self.timer.rearmed() => {}
            }
        }

        if !batch.is_empty() {
            self.flush(batch.take(), FlushTrigger::Final).await;
        }
        self.pool.close();
        self.in_flight.wait_idle().await;
        info!(dispatcher_id = self.id, "dispatcher drained");
        self.stats.snapshot()
    }

    /// Spawn the loop on the current runtime.
    pub fn spawn(self, events: mpsc::Receiver<InboundEvent>) -> DispatcherHandle {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let stats = Arc::clone(&self.stats);
        let in_flight = self.in_flight.clone();
        let handle = tokio::spawn(self.run_until(events, async move {
            // A dropped handle counts as a stop request.
            let _ = stop_rx.await;
        }));

        DispatcherHandle {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            stats,
            in_flight,
        }
    }

    async fn on_event(&self, event: InboundEvent, batch: &mut Batch) {
        StatsCounters::bump(&self.stats.events_received);
        let message = match SerializedMessage::from_event(&self.serializer, &event) {
            Ok(message) => message,
            Err(err) => {
                StatsCounters::bump(&self.stats.serialization_failures);
                error!(
                    dispatcher_id = self.id,
                    sender_id = %event.sender_id,
                    event_name = event.event.name(),
                    error = %err,
                    "error serializing event"
                );
                return;
            }
        };

        if batch.push(message).is_err() {
            error!(dispatcher_id = self.id, "batch over capacity, message dropped");
            return;
        }
        if batch.is_full() {
            debug!(
                dispatcher_id = self.id,
                messages = batch.len(),
                "calling publish due to capacity"
            );
            self.flush(batch.take(), FlushTrigger::Size).await;
        }
    }

    async fn on_deadline(&self, batch: &mut Batch) {
        if batch.is_empty() {
            StatsCounters::bump(&self.stats.empty_ticks);
            debug!(dispatcher_id = self.id, "skipping publish, no messages");
            self.timer.reset();
            return;
        }
        debug!(
            dispatcher_id = self.id,
            messages = batch.len(),
            "calling publish due to time"
        );
        self.flush(batch.take(), FlushTrigger::Time).await;
    }

    /// Hand `batch` to a publish task. Waits while the pool is saturated.
    async fn flush(&self, batch: Batch, trigger: FlushTrigger) {
        match trigger {
            FlushTrigger::Size => StatsCounters::bump(&self.stats.size_flushes),
            FlushTrigger::Time => StatsCounters::bump(&self.stats.time_flushes),
            FlushTrigger::Final => StatsCounters::bump(&self.stats.final_flushes),
        }
        let task = PublishTask {
            dispatcher_id: self.id,
            trigger,
            batch,
            topic: Arc::clone(&self.topic),
            timer: Arc::clone(&self.timer),
            metrics: Arc::clone(&self.metrics),
            stats: Arc::clone(&self.stats),
            in_flight: self.in_flight.start(),
        };

        let submitted = self
            .pool
            .submit(async move {
                task.run().await;
            })
            .await;
        if let Err(err) = submitted {
            error!(dispatcher_id = self.id, error = %err, "batch dropped");
            self.timer.reset();
        }
    }
}

/// Handle to a spawned dispatcher.
///
/// Dropping the handle stops the dispatcher; the loop still flushes and
/// drains in the background.
pub struct DispatcherHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<DispatchStats>>,
    stats: Arc<StatsCounters>,
    in_flight: InFlight,
}

impl DispatcherHandle {
    /// Signal the dispatcher to stop, wait for it to flush and drain, and
    /// return its statistics.
    pub async fn stop(mut self) -> DispatchStats {
        self.signal_stop();
        self.wait().await
    }

    /// Wait for the dispatcher to finish on its own (inbound source closed).
    pub async fn join(mut self) -> DispatchStats {
        self.wait().await
    }

    /// Signal the dispatcher to stop without waiting.
    pub fn signal_stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    /// Live statistics.
    pub fn stats(&self) -> DispatchStats {
        self.stats.snapshot()
    }

    /// Publish tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    async fn wait(&mut self) -> DispatchStats {
        match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(stats) => stats,
                Err(err) => {
                    error!(error = %err, "dispatcher task failed");
                    self.stats.snapshot()
                }
            },
            None => self.stats.snapshot(),
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
