//! Batching event publisher.
//!
//! Events arrive on a channel, are serialized into a bounded batch, and the
//! batch is published to a broker topic once it is full or once the flush
//! delay passes, whichever comes first. Publishing runs on a bounded worker
//! pool so a slow broker applies backpressure instead of unbounded work.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use batched_publisher::broker::{Broker, InMemoryBroker};
//! use batched_publisher::{Dispatcher, Event, InboundEvent, PublisherConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = PublisherConfig {
//!     project_id: "acme".into(),
//!     topic: "events".into(),
//!     max_batch_size: 2,
//!     max_flush_delay: Duration::from_millis(50),
//!     max_workers: 4,
//!     worker_idle_timeout: Duration::from_secs(10),
//! };
//! let broker = InMemoryBroker::new();
//! let dispatcher = Dispatcher::new(&broker, config, 0).await.unwrap();
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! let handle = dispatcher.spawn(rx);
//! tx.send(InboundEvent::new("s-1", Event::new("click", "1"))).await.unwrap();
//! tx.send(InboundEvent::new("s-1", Event::new("click", "1"))).await.unwrap();
//! drop(tx);
//!
//! let stats = handle.join().await;
//! assert_eq!(stats.messages_published, 2);
//! assert_eq!(broker.topic("acme", "events").len(), 2);
//! # });
//! ```

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pool;

pub use config::PublisherConfig;
pub use dispatch::{DispatchStats, Dispatcher, DispatcherHandle, PublishSummary};
pub use error::{
    BrokerError, ConfigError, DispatcherError, PublishError, SerializeError, TrackError,
};
pub use event::{Event, EventSerializer, InboundEvent, JsonSerializer, TrackRequest};
#[cfg(feature = "metrics")]
pub use crate::metrics::MetricsRecorder;
pub use crate::metrics::{NoopMetrics, PublishMetrics, RecordingMetrics};
pub use pool::WorkerPool;
