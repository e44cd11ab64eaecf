//! WebSocket Message Types
//!
//! Every frame in either direction is a JSON text message
//! `{"event": "<name>", "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::events::ChatEvent;

/// Incoming frame
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl InboundFrame {
    /// The known event this frame carries, if any.
    pub fn kind(&self) -> Option<ChatEvent> {
        ChatEvent::from_name(&self.event)
    }
}

/// Outgoing frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub event: &'static str,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl OutboundFrame {
    pub fn new(event: ChatEvent, data: Value) -> Self {
        Self {
            event: event.as_str(),
            data,
        }
    }
}
