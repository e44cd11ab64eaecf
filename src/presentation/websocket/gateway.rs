//! WebSocket Gateway
//!
//! Connection registry and room table. A connection becomes part of the
//! registry only after a successful handshake; from then on it is a member of
//! its user's room plus every chat room it joined.
//!
//! Both maps are sharded (`DashMap`). No two shard guards are ever held at
//! the same time and none is held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;

use super::messages::OutboundFrame;
use crate::application::events::{user_room, ChatEvent, EventEmitter};
use crate::infrastructure::metrics;

pub type ConnectionId = String;
pub type FrameSender = mpsc::UnboundedSender<OutboundFrame>;

/// Registered connection
struct Connection {
    user_id: i64,
    sender: FrameSender,
    rooms: HashSet<String>,
}

/// WebSocket gateway managing all connections
pub struct Gateway {
    /// Registered connections by id
    connections: DashMap<ConnectionId, Connection>,
    /// Room name to member connections
    rooms: DashMap<String, HashMap<ConnectionId, FrameSender>>,
    /// Open sockets, registered or not
    open_sockets: AtomicI64,
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            open_sockets: AtomicI64::new(0),
        }
    }

    /// Register an authenticated connection and place it in its user room.
    pub fn register(&self, connection_id: &str, user_id: i64, sender: FrameSender) {
        self.connections.insert(
            connection_id.to_string(),
            Connection {
                user_id,
                sender,
                rooms: HashSet::new(),
            },
        );
        self.join(connection_id, &user_room(user_id));
        self.update_metrics();

        tracing::info!(user_id, connection_id, "Connection registered");
    }

    /// Add a registered connection to `room`. Returns false for unknown
    /// connections.
    pub fn join(&self, connection_id: &str, room: &str) -> bool {
        let sender = match self.connections.get_mut(connection_id) {
            Some(mut conn) => {
                conn.rooms.insert(room.to_string());
                conn.sender.clone()
            }
            None => return false,
        };

        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection_id.to_string(), sender);
        true
    }

    /// Remove a connection from every room it is in. Unknown connections are
    /// ignored, so this is safe to call more than once.
    pub fn unregister(&self, connection_id: &str) {
        let Some((_, conn)) = self.connections.remove(connection_id) else {
            return;
        };

        for room in &conn.rooms {
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.remove(connection_id);
            }
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
        self.update_metrics();

        tracing::info!(user_id = conn.user_id, connection_id, "Connection unregistered");
    }

    /// Deliver to every connection in `room` except `skip`.
    pub fn broadcast_except(
        &self,
        room: &str,
        skip: Option<&str>,
        event: ChatEvent,
        payload: Value,
    ) {
        let frame = OutboundFrame::new(event, payload);
        let emptied = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.retain(|id, sender| {
                    if skip == Some(id.as_str()) {
                        return true;
                    }
                    sender.send(frame.clone()).is_ok()
                });
                members.is_empty()
            }
            None => return,
        };
        if emptied {
            self.rooms.remove_if(room, |_, members| members.is_empty());
        }
        metrics::record_event_emitted(event.as_str());
    }

    pub fn is_registered(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Rooms a connection is a member of.
    pub fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        self.connections
            .get(connection_id)
            .map(|c| c.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of connections in a room.
    pub fn room_size(&self, room: &str) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    /// Get registered connection count
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn socket_opened(&self) {
        self.open_sockets.fetch_add(1, Ordering::Relaxed);
        self.update_metrics();
    }

    pub fn socket_closed(&self) {
        self.open_sockets.fetch_sub(1, Ordering::Relaxed);
        self.update_metrics();
    }

    fn update_metrics(&self) {
        metrics::set_websocket_connections(
            self.open_sockets.load(Ordering::Relaxed),
            self.connections.len() as i64,
        );
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter for Gateway {
    fn emit(&self, room: &str, event: ChatEvent, payload: Value) {
        self.broadcast_except(room, None, event, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel() -> (FrameSender, mpsc::UnboundedReceiver<OutboundFrame>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_joins_user_room() {
        let gateway = Gateway::new();
        let (tx, mut rx) = channel();
        gateway.register("c1", 7, tx);

        assert!(gateway.is_registered("c1"));
        assert_eq!(gateway.rooms_of("c1"), vec!["user:7".to_string()]);

        gateway.emit_to_user(7, ChatEvent::NewChat, json!({"id": "1"}));
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.event, "newChat");
    }

    #[test]
    fn test_multiple_devices_share_user_room() {
        let gateway = Gateway::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        gateway.register("phone", 7, tx1);
        gateway.register("laptop", 7, tx2);

        gateway.emit_to_user(7, ChatEvent::DeleteChat, json!({}));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert_eq!(gateway.room_size("user:7"), 2);
    }

    #[test]
    fn test_unregistered_connection_cannot_join() {
        let gateway = Gateway::new();
        assert!(!gateway.join("ghost", "chat:1"));
        assert_eq!(gateway.room_size("chat:1"), 0);
    }

    #[test]
    fn test_unregister_leaves_every_room_and_is_idempotent() {
        let gateway = Gateway::new();
        let (tx, _rx) = channel();
        gateway.register("c1", 7, tx);
        gateway.join("c1", "chat:1");
        gateway.join("c1", "chat:2");

        gateway.unregister("c1");
        gateway.unregister("c1");
        gateway.unregister("never-registered");

        assert!(!gateway.is_registered("c1"));
        assert_eq!(gateway.room_size("user:7"), 0);
        assert_eq!(gateway.room_size("chat:1"), 0);
        assert_eq!(gateway.room_size("chat:2"), 0);
    }

    #[test]
    fn test_broadcast_skips_origin() {
        let gateway = Gateway::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        gateway.register("c1", 1, tx1);
        gateway.register("c2", 2, tx2);
        gateway.join("c1", "chat:9");
        gateway.join("c2", "chat:9");

        gateway.broadcast_except("chat:9", Some("c1"), ChatEvent::Typing, json!("c1"));

        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap().data, json!("c1"));
    }

    #[test]
    fn test_emit_to_unknown_room_is_noop() {
        let gateway = Gateway::new();
        gateway.emit("chat:404", ChatEvent::MessageReceived, json!({}));
        assert_eq!(gateway.room_size("chat:404"), 0);
    }

    #[test]
    fn test_closed_receivers_are_pruned() {
        let gateway = Gateway::new();
        let (tx, rx) = channel();
        gateway.register("c1", 3, tx);
        drop(rx);

        gateway.emit_to_user(3, ChatEvent::NewChat, json!({}));
        assert_eq!(gateway.room_size("user:3"), 0);
    }
}
