//! Shared harness for dispatcher tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use batched_publisher::broker::{Broker, InMemoryBroker, InMemoryTopic, ATTR_EVENT_NAME};
use batched_publisher::{
    Dispatcher, DispatcherHandle, Event, EventSerializer, InboundEvent, JsonSerializer,
    PublisherConfig, RecordingMetrics, SerializeError,
};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const PROJECT: &str = "acme";
pub const TOPIC: &str = "events";

pub fn config(max_batch_size: usize, max_flush_delay_ms: u64, max_workers: usize) -> PublisherConfig {
    PublisherConfig {
        project_id: PROJECT.to_string(),
        topic: TOPIC.to_string(),
        max_batch_size,
        max_flush_delay: Duration::from_millis(max_flush_delay_ms),
        max_workers,
        worker_idle_timeout: Duration::from_secs(30),
    }
}

pub fn event(name: &str) -> InboundEvent {
    InboundEvent::new("sender-1", Event::new(name, "1").with_field("name", name))
}

/// Fails to serialize events with the given name.
pub struct RejectingSerializer(pub &'static str);

impl EventSerializer for RejectingSerializer {
    fn encode(&self, event: &InboundEvent) -> Result<Vec<u8>, SerializeError> {
        if event.event.name() == self.0 {
            return Err(SerializeError(format!("cannot encode {}", self.0)));
        }
        JsonSerializer.encode(event)
    }
}

pub struct Harness {
    pub broker: InMemoryBroker,
    pub topic: InMemoryTopic,
    pub metrics: RecordingMetrics,
    pub tx: mpsc::Sender<InboundEvent>,
    pub handle: DispatcherHandle,
}

impl Harness {
    pub async fn start(config: PublisherConfig) -> Self {
        Self::start_with(config, JsonSerializer, |_| {}).await
    }

    /// Start a dispatcher, letting `prepare` script the topic first.
    pub async fn start_with<S, F>(config: PublisherConfig, serializer: S, prepare: F) -> Self
    where
        S: EventSerializer + 'static,
        F: FnOnce(&InMemoryTopic),
    {
        let broker = InMemoryBroker::new();
        let metrics = RecordingMetrics::new();
        let dispatcher = Dispatcher::new(&broker, config, 1)
            .await
            .unwrap()
            .with_serializer(serializer)
            .with_metrics(metrics.clone());
        let topic = broker.topic(PROJECT, TOPIC);
        prepare(&topic);

        let (tx, rx) = mpsc::channel(256);
        let handle = dispatcher.spawn(rx);
        Self {
            broker,
            topic,
            metrics,
            tx,
            handle,
        }
    }

    pub async fn send(&self, names: &[&str]) {
        for name in names {
            self.tx.send(event(name)).await.unwrap();
        }
    }

    /// Event names in the order the broker received them.
    pub fn published_names(&self) -> Vec<String> {
        event_names(&self.topic)
    }

    /// Message count of each completed publish attempt.
    pub fn batch_sizes(&self) -> Vec<u64> {
        self.metrics
            .outcomes()
            .iter()
            .map(|o| o.succeeded + o.failed)
            .collect()
    }
}

/// Event names recorded by `topic`, in submission order.
pub fn event_names(topic: &InMemoryTopic) -> Vec<String> {
    topic
        .messages()
        .iter()
        .filter_map(|m| m.attribute(ATTR_EVENT_NAME).map(str::to_string))
        .collect()
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// One log event seen by a `LogCapture`.
#[derive(Debug, Clone)]
pub struct CapturedLog {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedLog {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Records every log event emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    logs: Arc<Mutex<Vec<CapturedLog>>>,
}

impl LogCapture {
    /// Install as the thread's default subscriber until the guard drops.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Error-level events with the given message.
    pub fn errors(&self, message: &str) -> Vec<CapturedLog> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.level == Level::ERROR && log.message == message)
            .cloned()
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut log = CapturedLog {
            level: *event.metadata().level(),
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut FieldRecorder(&mut log));
        self.logs.lock().unwrap().push(log);
    }
}

struct FieldRecorder<'a>(&'a mut CapturedLog);

impl FieldRecorder<'_> {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.0.message = value;
        } else {
            self.0.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}
