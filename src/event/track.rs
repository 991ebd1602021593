use serde::{Deserialize, Serialize};

use super::{Event, InboundEvent};
use crate::error::TrackError;

/// Batch of events reported by one sender.
///
/// ```text
/// {"sender_id": "my id", "events": [{"type": {...}, "payload": {...}}, ...]}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackRequest {
    pub sender_id: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl TrackRequest {
    pub fn from_json(bytes: &[u8]) -> Result<Self, TrackError> {
        serde_json::from_slice(bytes).map_err(|err| TrackError::Request(err.to_string()))
    }

    /// Check required fields; reports the first offending event.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.sender_id.trim().is_empty() {
            return Err(TrackError::Request("sender_id is required".to_string()));
        }
        for (index, event) in self.events.iter().enumerate() {
            if event.event_type.event_version.trim().is_empty() {
                return Err(TrackError::item(index, "event_version is required"));
            }
            if event.event_type.event_name.trim().is_empty() {
                return Err(TrackError::item(index, "event_name is required"));
            }
        }
        Ok(())
    }

    /// Validate and split into one `InboundEvent` per reported event.
    pub fn into_inbound(self) -> Result<Vec<InboundEvent>, TrackError> {
        self.validate()?;
        let sender_id = self.sender_id;
        Ok(self
            .events
            .into_iter()
            .map(|event| InboundEvent::new(sender_id.clone(), event))
            .collect())
    }
}
