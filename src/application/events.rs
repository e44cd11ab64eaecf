//! Real-time event catalog and the emit primitive services publish through.

use serde::Serialize;
use serde_json::Value;

use crate::domain::ChatError;

/// Events exchanged over the socket, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatEvent {
    /// Handshake accepted (server → client)
    Connected,
    /// Handshake rejected; payload is the reason (server → client)
    SocketError,
    /// Subscribe to a chat room; payload is the chat id (client → server)
    JoinChat,
    /// Someone in the room started typing; payload is their connection id
    Typing,
    /// Someone in the room stopped typing; payload is their connection id
    StopTyping,
    /// Client-initiated teardown (client → server)
    Disconnect,
    /// A chat the recipient belongs to was created, or they were added to one
    NewChat,
    /// A group chat was renamed
    UpdateGroupName,
    /// A chat the recipient belonged to was deleted
    DeleteChat,
    /// The recipient was removed from a group chat
    LeaveChat,
    /// A new message in one of the recipient's chats
    MessageReceived,
}

impl ChatEvent {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::SocketError => "socketError",
            Self::JoinChat => "joinChat",
            Self::Typing => "typing",
            Self::StopTyping => "stopTyping",
            Self::Disconnect => "disconnect",
            Self::NewChat => "newChat",
            Self::UpdateGroupName => "updateGroupName",
            Self::DeleteChat => "deleteChat",
            Self::LeaveChat => "leaveChat",
            Self::MessageReceived => "messageReceived",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "connected" => Self::Connected,
            "socketError" => Self::SocketError,
            "joinChat" => Self::JoinChat,
            "typing" => Self::Typing,
            "stopTyping" => Self::StopTyping,
            "disconnect" => Self::Disconnect,
            "newChat" => Self::NewChat,
            "updateGroupName" => Self::UpdateGroupName,
            "deleteChat" => Self::DeleteChat,
            "leaveChat" => Self::LeaveChat,
            "messageReceived" => Self::MessageReceived,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room every connection of a user is placed in.
pub fn user_room(user_id: i64) -> String {
    format!("user:{}", user_id)
}

/// Room of connections that joined a chat.
pub fn chat_room(chat_id: i64) -> String {
    format!("chat:{}", chat_id)
}

/// Serialize a hydrated view into an event payload.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Value, ChatError> {
    serde_json::to_value(value)
        .map_err(|e| ChatError::internal(format!("Failed to encode event payload: {}", e)))
}

/// Room-scoped broadcast.
///
/// Delivery is fire-and-forget: emitting to a room without members is a
/// no-op and implementations must not block the caller.
pub trait EventEmitter: Send + Sync {
    /// Deliver `payload` to every connection currently in `room`.
    fn emit(&self, room: &str, event: ChatEvent, payload: Value);

    /// Deliver to every connection of a user.
    fn emit_to_user(&self, user_id: i64, event: ChatEvent, payload: Value) {
        self.emit(&user_room(user_id), event, payload);
    }
}
