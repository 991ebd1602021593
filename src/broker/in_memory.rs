//! In-memory broker for testing and single-process scenarios.
//!
//! This module provides a thread-safe broker double that implements both
//! `Broker` and `Topic`, useful for:
//! - Unit and integration testing without a real broker
//! - Scripting per-message rejections and slow acknowledgements
//! - Development and prototyping

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::broker::{Broker, Topic};
use super::message::SerializedMessage;
use super::outcome::OutcomeHandle;
use crate::error::{BrokerError, PublishError};

type RejectFn = Box<dyn Fn(&SerializedMessage) -> bool + Send + Sync>;

/// In-memory broker.
///
/// Clones share the same topics, so a test can keep one handle for
/// inspection while the dispatcher owns another.
///
/// ## Example
///
/// ```
/// use batched_publisher::broker::{ensure_topic, InMemoryBroker, SerializedMessage, Topic};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let broker = InMemoryBroker::new();
/// let topic = ensure_topic(&broker, "acme", "events").await.unwrap();
///
/// let id = topic.publish(SerializedMessage::new(b"{}".to_vec())).get().await.unwrap();
/// assert_eq!(id, "events-1");
/// assert_eq!(topic.len(), 1);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

#[derive(Default)]
struct BrokerState {
    topics: RwLock<HashMap<String, InMemoryTopic>>,
    created: Mutex<Vec<String>>,
    admin_failure: Mutex<Option<BrokerError>>,
    create_race: AtomicBool,
}

fn topic_key(project_id: &str, topic: &str) -> String {
    format!("{}/{}", project_id, topic)
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a topic, as if it had been created earlier.
    pub fn with_topic(self, project_id: &str, topic: &str) -> Self {
        self.state
            .topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic_key(project_id, topic), InMemoryTopic::new(topic));
        self
    }

    /// Make every administrative call fail with `error`.
    pub fn with_admin_failure(self, error: BrokerError) -> Self {
        *self
            .state
            .admin_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }

    /// Simulate another client creating the topic between the existence
    /// check and our create call.
    pub fn with_create_race(self) -> Self {
        self.state.create_race.store(true, Ordering::SeqCst);
        self
    }

    pub fn has_topic(&self, project_id: &str, topic: &str) -> bool {
        self.state
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&topic_key(project_id, topic))
    }

    /// Topics created through `create_topic`, as `project/topic`.
    pub fn created_topics(&self) -> Vec<String> {
        self.state
            .created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn admin_failure(&self) -> Option<BrokerError> {
        self.state
            .admin_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    type Topic = InMemoryTopic;

    async fn topic_exists(&self, project_id: &str, topic: &str) -> Result<bool, BrokerError> {
        if let Some(err) = self.admin_failure() {
            return Err(err);
        }
        Ok(self.has_topic(project_id, topic))
    }

    async fn create_topic(
        &self,
        project_id: &str,
        topic: &str,
    ) -> Result<InMemoryTopic, BrokerError> {
        if let Some(err) = self.admin_failure() {
            return Err(err);
        }
        let key = topic_key(project_id, topic);
        let mut topics = self
            .state
            .topics
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if self.state.create_race.swap(false, Ordering::SeqCst) {
            topics.insert(key, InMemoryTopic::new(topic));
            return Err(BrokerError::TopicExists(topic.to_string()));
        }
        if topics.contains_key(&key) {
            return Err(BrokerError::TopicExists(topic.to_string()));
        }

        let handle = InMemoryTopic::new(topic);
        topics.insert(key.clone(), handle.clone());
        self.state
            .created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key);
        Ok(handle)
    }

    fn topic(&self, project_id: &str, topic: &str) -> InMemoryTopic {
        self.state
            .topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic_key(project_id, topic))
            .or_insert_with(|| InMemoryTopic::new(topic))
            .clone()
    }
}

/// In-memory topic. Records every submitted message in submission order.
#[derive(Clone)]
pub struct InMemoryTopic {
    state: Arc<TopicState>,
}

impl fmt::Debug for InMemoryTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTopic")
            .field("name", &self.state.name)
            .field("messages", &self.len())
            .field("failed", &self.failed())
            .finish()
    }
}

struct TopicState {
    name: String,
    log: Mutex<Vec<SerializedMessage>>,
    sequence: AtomicU64,
    failed: AtomicUsize,
    reject: RwLock<Option<RejectFn>>,
    ack_delay: Mutex<Option<Duration>>,
    pending: AtomicUsize,
    max_pending: AtomicUsize,
}

impl InMemoryTopic {
    fn new(name: &str) -> Self {
        Self {
            state: Arc::new(TopicState {
                name: name.to_string(),
                log: Mutex::new(Vec::new()),
                sequence: AtomicU64::new(0),
                failed: AtomicUsize::new(0),
                reject: RwLock::new(None),
                ack_delay: Mutex::new(None),
                pending: AtomicUsize::new(0),
                max_pending: AtomicUsize::new(0),
            }),
        }
    }

    /// Reject every message for which `predicate` returns true.
    pub fn reject_when<F>(&self, predicate: F)
    where
        F: Fn(&SerializedMessage) -> bool + Send + Sync + 'static,
    {
        *self
            .state
            .reject
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(predicate));
    }

    /// Acknowledge each message only after `delay`.
    pub fn set_ack_delay(&self, delay: Duration) {
        *self
            .state
            .ack_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Every message submitted so far, accepted or not.
    pub fn messages(&self) -> Vec<SerializedMessage> {
        self.state
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Submitted payloads as UTF-8 strings.
    pub fn payloads(&self) -> Vec<String> {
        self.messages()
            .iter()
            .map(|m| String::from_utf8_lossy(&m.data).into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of rejected messages.
    pub fn failed(&self) -> usize {
        self.state.failed.load(Ordering::SeqCst)
    }

    /// Highest number of unacknowledged messages observed at once.
    pub fn max_pending(&self) -> usize {
        self.state.max_pending.load(Ordering::SeqCst)
    }

    fn outcome_for(&self, message: &SerializedMessage) -> Result<String, PublishError> {
        let rejected = self
            .state
            .reject
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|predicate| predicate(message))
            .unwrap_or(false);
        if rejected {
            self.state.failed.fetch_add(1, Ordering::SeqCst);
            return Err(PublishError::Rejected(format!(
                "{} rejected message",
                self.state.name
            )));
        }
        let seq = self.state.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-{}", self.state.name, seq))
    }
}

impl Topic for InMemoryTopic {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn publish(&self, message: SerializedMessage) -> OutcomeHandle {
        let outcome = self.outcome_for(&message);
        self.state
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);

        let delay = *self
            .state
            .ack_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(delay) = delay else {
            return OutcomeHandle::ready(outcome);
        };

        let pending = self.state.pending.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_pending.fetch_max(pending, Ordering::SeqCst);
        let (sender, handle) = OutcomeHandle::pending();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.pending.fetch_sub(1, Ordering::SeqCst);
            sender.resolve(outcome);
        });
        handle
    }
}
