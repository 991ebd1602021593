use serde::{Deserialize, Serialize};

/// Free-form event payload, stored as-is in the published message.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Event metadata: which event this is and which schema version it follows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub event_version: String,
    pub event_name: String,
}

/// A single reported event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub payload: Payload,
}

impl Event {
    pub fn new(event_name: impl Into<String>, event_version: impl Into<String>) -> Self {
        Self {
            event_type: EventType {
                event_version: event_version.into(),
                event_name: event_name.into(),
            },
            payload: Payload::new(),
        }
    }

    /// Add a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.event_type.event_name
    }

    pub fn version(&self) -> &str {
        &self.event_type.event_version
    }
}

/// The unit consumed by the dispatch loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub sender_id: String,
    pub event: Event,
}

impl InboundEvent {
    pub fn new(sender_id: impl Into<String>, event: Event) -> Self {
        Self {
            sender_id: sender_id.into(),
            event,
        }
    }
}
