use serde::{Deserialize, Serialize};

use super::InboundEvent;
use crate::error::SerializeError;

/// Turns one inbound event into the bytes carried by a broker message.
pub trait EventSerializer: Send + Sync {
    fn encode(&self, event: &InboundEvent) -> Result<Vec<u8>, SerializeError>;
}

/// JSON encoding of the whole `InboundEvent`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl EventSerializer for JsonSerializer {
    fn encode(&self, event: &InboundEvent) -> Result<Vec<u8>, SerializeError> {
        Ok(serde_json::to_vec(event)?)
    }
}

/// Compact binary encoding via bitcode.
///
/// The payload map is embedded as a JSON string since bitcode cannot carry
/// self-describing values.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitcodeSerializer;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct BitcodeEvent {
    pub sender_id: String,
    pub event_name: String,
    pub event_version: String,
    pub payload: String,
}

impl EventSerializer for BitcodeSerializer {
    fn encode(&self, event: &InboundEvent) -> Result<Vec<u8>, SerializeError> {
        let wire = BitcodeEvent {
            sender_id: event.sender_id.clone(),
            event_name: event.event.event_type.event_name.clone(),
            event_version: event.event.event_type.event_version.clone(),
            payload: serde_json::to_string(&event.event.payload)?,
        };
        Ok(bitcode::serialize(&wire)?)
    }
}

impl<S: EventSerializer + ?Sized> EventSerializer for Box<S> {
    fn encode(&self, event: &InboundEvent) -> Result<Vec<u8>, SerializeError> {
        (**self).encode(event)
    }
}

impl<S: EventSerializer + ?Sized> EventSerializer for std::sync::Arc<S> {
    fn encode(&self, event: &InboundEvent) -> Result<Vec<u8>, SerializeError> {
        (**self).encode(event)
    }
}
