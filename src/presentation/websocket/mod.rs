//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod gateway;
pub mod handler;
pub mod messages;
pub mod router;
pub mod session;

pub use gateway::{ConnectionId, Gateway};
pub use handler::ws_handler;
pub use messages::{InboundFrame, OutboundFrame};
pub use router::{route, RouteOutcome};
pub use session::SessionState;
