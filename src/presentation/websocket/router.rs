//! Event Router
//!
//! Dispatches inbound frames of an authenticated connection. Room joins are
//! not authorized here; membership only controls which broadcasts a socket
//! sees, and every chat payload is also delivered through the user rooms.

use serde_json::{json, Value};

use super::gateway::Gateway;
use super::messages::InboundFrame;
use super::session::SessionState;
use crate::application::events::{chat_room, ChatEvent};

/// What the connection loop should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Continue,
    Disconnect,
}

/// Handle one inbound frame.
pub fn route(gateway: &Gateway, session: &SessionState, frame: &InboundFrame) -> RouteOutcome {
    let connection_id = session.connection_id.as_str();

    let Some(event) = frame.kind() else {
        tracing::debug!(connection_id, event = %frame.event, "Unknown event");
        return RouteOutcome::Continue;
    };

    match event {
        ChatEvent::JoinChat => match chat_id(&frame.data) {
            Some(chat_id) => {
                gateway.join(connection_id, &chat_room(chat_id));
                tracing::info!(
                    connection_id,
                    user_id = session.user_id,
                    chat_id,
                    "User joined the chat"
                );
            }
            None => tracing::debug!(connection_id, "joinChat without a chat id"),
        },
        ChatEvent::Typing | ChatEvent::StopTyping => match chat_id(&frame.data) {
            Some(chat_id) => gateway.broadcast_except(
                &chat_room(chat_id),
                Some(connection_id),
                event,
                json!(connection_id),
            ),
            None => tracing::debug!(connection_id, %event, "Typing event without a chat id"),
        },
        ChatEvent::Disconnect => return RouteOutcome::Disconnect,
        other => {
            tracing::debug!(connection_id, event = %other, "Ignoring server-side event from client");
        }
    }

    RouteOutcome::Continue
}

/// Chat ids arrive as Snowflake strings; bare numbers are accepted too.
fn chat_id(data: &Value) -> Option<i64> {
    match data {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        Value::Object(map) => map.get("chatId").and_then(chat_id),
        _ => None,
    }
}
