//! Inbound events and their serialization.
//!
//! An `InboundEvent` is what the upstream intake stage pushes onto the
//! dispatcher's channel: one `Event` tagged with the id of the sender that
//! reported it. `TrackRequest` is the wire shape senders post, carrying many
//! events at once; it is validated and split into `InboundEvent`s before
//! reaching the dispatcher.

mod inbound;
mod serializer;
mod track;

pub use crate::error::TrackError;
pub use inbound::{Event, EventType, InboundEvent, Payload};
pub use serializer::{BitcodeSerializer, EventSerializer, JsonSerializer};
pub use track::TrackRequest;
