//! Broker and topic traits, plus topic provisioning.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::message::SerializedMessage;
use super::outcome::OutcomeHandle;
use crate::error::BrokerError;

/// A publish target.
///
/// Implementations might include:
/// - `InMemoryTopic` - For testing and single-process scenarios
/// - A Cloud Pub/Sub topic
/// - A Kafka producer bound to one topic
pub trait Topic: Send + Sync + 'static {
    /// Topic name, for logs.
    fn name(&self) -> &str;

    /// Hand one message to the broker. Must not block; the result arrives
    /// through the returned handle.
    fn publish(&self, message: SerializedMessage) -> OutcomeHandle;
}

impl<T: Topic + ?Sized> Topic for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(&self, message: SerializedMessage) -> OutcomeHandle {
        (**self).publish(message)
    }
}

/// Administrative side of a broker client.
#[async_trait]
pub trait Broker: Send + Sync {
    type Topic: Topic;

    async fn topic_exists(&self, project_id: &str, topic: &str) -> Result<bool, BrokerError>;

    /// Create the topic. Returns `BrokerError::TopicExists` if another
    /// client created it first.
    async fn create_topic(&self, project_id: &str, topic: &str)
        -> Result<Self::Topic, BrokerError>;

    /// Handle to a topic known to exist.
    fn topic(&self, project_id: &str, topic: &str) -> Self::Topic;
}

/// Get-or-create a topic.
///
/// A concurrent creation by another client is treated as "exists".
pub async fn ensure_topic<B>(
    broker: &B,
    project_id: &str,
    topic: &str,
) -> Result<B::Topic, BrokerError>
where
    B: Broker + ?Sized,
{
    let exists = broker.topic_exists(project_id, topic).await.map_err(|err| {
        error!(project_id, topic, error = %err, "topic exists check failed");
        err
    })?;
    if exists {
        info!(project_id, topic, "topic exists");
        return Ok(broker.topic(project_id, topic));
    }

    match broker.create_topic(project_id, topic).await {
        Ok(handle) => {
            info!(project_id, topic, "topic created");
            Ok(handle)
        }
        Err(BrokerError::TopicExists(_)) => {
            info!(project_id, topic, "topic created concurrently");
            Ok(broker.topic(project_id, topic))
        }
        Err(err) => {
            error!(project_id, topic, error = %err, "topic creation failed");
            Err(err)
        }
    }
}
