//! Broker ports - the publish target the dispatcher writes batches to.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Broker (per project)                        │
//! │  - topic_exists() / create_topic() / topic()                 │
//! │  - ensure_topic(): get-or-create, resolved once at startup   │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Topic handle                            │
//! │  publish(message) -> OutcomeHandle   (never blocks)          │
//! │  OutcomeHandle::get().await -> Result<MessageId, _>          │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                   │
//!          ▼                                   ▼
//! ┌──────────────────┐              ┌───────────────────────────┐
//! │ InMemoryBroker   │              │ Cloud Pub/Sub, Kafka, ... │
//! │ (included)       │              │ (external)                │
//! └──────────────────┘              └───────────────────────────┘
//! ```

mod broker;
mod in_memory;
mod message;
mod outcome;

pub use broker::{ensure_topic, Broker, Topic};
pub use in_memory::{InMemoryBroker, InMemoryTopic};
pub use message::{SerializedMessage, ATTR_EVENT_NAME, ATTR_EVENT_VERSION, ATTR_SENDER_ID};
pub use outcome::{MessageId, OutcomeHandle, OutcomeSender};
