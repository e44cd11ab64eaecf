//! WebSocket Session State

use std::time::{Duration, Instant};

use uuid::Uuid;

/// Per-socket state owned by the connection task
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: String,
    /// Set once the handshake succeeded
    pub user_id: Option<i64>,
    pub opened_at: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            connection_id: Uuid::new_v4().to_string(),
            user_id: None,
            opened_at: Instant::now(),
        }
    }

    pub fn authenticate(&mut self, user_id: i64) {
        self.user_id = Some(user_id);
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
