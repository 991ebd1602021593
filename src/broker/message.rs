//! The byte-level message handed to a topic.

use crate::event::{EventSerializer, InboundEvent};
use crate::error::SerializeError;

pub const ATTR_SENDER_ID: &str = "sender_id";
pub const ATTR_EVENT_NAME: &str = "event_name";
pub const ATTR_EVENT_VERSION: &str = "event_version";

/// One serialized event plus broker attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedMessage {
    /// Serialized event bytes
    pub data: Vec<u8>,
    /// Broker attributes (routing, filtering)
    pub attributes: Vec<(String, String)>,
}

impl SerializedMessage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            attributes: Vec::new(),
        }
    }

    /// Serialize an inbound event and tag it with sender and event type.
    pub fn from_event<S>(serializer: &S, event: &InboundEvent) -> Result<Self, SerializeError>
    where
        S: EventSerializer + ?Sized,
    {
        let data = serializer.encode(event)?;
        Ok(Self::new(data)
            .with_attribute(ATTR_SENDER_ID, event.sender_id.as_str())
            .with_attribute(ATTR_EVENT_NAME, event.event.name())
            .with_attribute(ATTR_EVENT_VERSION, event.event.version()))
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the data as a string (if valid UTF-8).
    pub fn data_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
