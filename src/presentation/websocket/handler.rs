//! WebSocket Connection Handler
//!
//! Authenticates the handshake, registers the connection with the gateway
//! and feeds inbound frames to the event router.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::gateway::{FrameSender, Gateway};
use super::messages::{InboundFrame, OutboundFrame};
use super::router::{route, RouteOutcome};
use super::session::SessionState;
use crate::application::events::ChatEvent;
use crate::application::services::SessionAuthenticator;
use crate::presentation::middleware::{bearer_token, cookie_token};
use crate::startup::AppState;

/// How long a closing socket may spend flushing queued frames.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handshake query parameters
#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Handshake token: `accessToken` cookie, then Authorization header, then
/// the `token` query parameter.
pub fn handshake_token(headers: &HeaderMap, query: &SocketQuery) -> Option<String> {
    cookie_token(headers)
        .or_else(|| bearer_token(headers))
        .or_else(|| query.token.clone())
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SocketQuery>,
) -> Response {
    let token = handshake_token(&headers, &query);
    let limits = &state.settings.websocket;

    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, token))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, token: Option<String>) {
    let mut session = SessionState::new();
    let connection_id = session.connection_id.clone();
    state.gateway.socket_opened();

    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    // Split socket for concurrent read/write
    let (sender, mut receiver) = socket.split();

    // Create channel for outgoing frames
    let (tx, rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let writer = tokio::spawn(forward_frames(sender, rx));

    handshake(
        &state.gateway,
        &state.authenticator,
        &mut session,
        token.as_deref(),
        &tx,
    )
    .await;

    // Main message loop
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if dispatch_text(&state.gateway, &session, text.as_str()) == RouteOutcome::Disconnect {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection_id, "Connection closed");
                break;
            }
            Ok(_) => {
                // Ping/Pong are handled automatically by axum
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup. Unregistering drops the gateway's copies of the sender, so the
    // writer sees the queue close once it has flushed what is left.
    state.gateway.unregister(&connection_id);
    state.gateway.socket_closed();
    finish_writer(tx, writer).await;

    tracing::info!(
        user_id = session.user_id,
        connection_id = %connection_id,
        duration_secs = session.age().as_secs(),
        "User disconnected"
    );
}

/// Authenticate a freshly opened socket.
///
/// On success the connection is registered under its user and receives
/// `connected`. On failure it receives a single `socketError`, stays
/// unregistered and is left open. Returns whether authentication succeeded.
pub(crate) async fn handshake(
    gateway: &Gateway,
    authenticator: &SessionAuthenticator,
    session: &mut SessionState,
    token: Option<&str>,
    tx: &FrameSender,
) -> bool {
    match authenticator.authenticate(token).await {
        Ok(user) => {
            session.authenticate(user.id);
            gateway.register(&session.connection_id, user.id, tx.clone());
            let _ = tx.send(OutboundFrame::new(ChatEvent::Connected, Value::Null));

            tracing::info!(
                user_id = user.id,
                connection_id = %session.connection_id,
                "User connected"
            );
            true
        }
        Err(e) => {
            tracing::warn!(connection_id = %session.connection_id, error = %e, "Socket handshake rejected");
            let _ = tx.send(OutboundFrame::new(ChatEvent::SocketError, json!(e.to_string())));
            false
        }
    }
}

/// Parse and route one inbound text frame.
///
/// Unauthenticated sockets stay open but nothing they send is routed, not
/// even `disconnect`.
pub(crate) fn dispatch_text(gateway: &Gateway, session: &SessionState, text: &str) -> RouteOutcome {
    if !session.is_authenticated() {
        return RouteOutcome::Continue;
    }
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => route(gateway, session, &frame),
        Err(e) => {
            tracing::debug!(connection_id = %session.connection_id, error = %e, "Invalid frame");
            RouteOutcome::Continue
        }
    }
}

/// Serialize queued frames onto the socket until the queue closes or the
/// socket stops accepting writes.
async fn forward_frames<S>(mut sink: S, mut rx: mpsc::UnboundedReceiver<OutboundFrame>)
where
    S: Sink<Message> + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let text = match serde_json::to_string(&frame) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("Failed to serialize frame: {}", e);
                continue;
            }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}

/// Close the outbound queue and give the writer a short window to flush it.
async fn finish_writer(tx: FrameSender, mut writer: JoinHandle<()>) {
    drop(tx);
    if timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        tracing::debug!("Socket writer did not drain in time");
        writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{Claims, JwtTokenVerifier};
    use crate::domain::User;
    use crate::infrastructure::memory::InMemoryStore;
    use axum::http::header::{AUTHORIZATION, COOKIE};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::sync::Arc;

    const SECRET: &str = "handler-test-secret-with-at-least-32-chars";

    fn authenticator() -> SessionAuthenticator {
        let store = InMemoryStore::new();
        store.insert_user(User {
            id: 7,
            username: "alice".into(),
            email: "alice@example.com".into(),
            ..Default::default()
        });
        SessionAuthenticator::new(Arc::new(JwtTokenVerifier::new(SECRET)), Arc::new(store))
    }

    fn token_for(user_id: i64, secret: &str) -> String {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + chrono::Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<OutboundFrame> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    async fn open(token: Option<&str>) -> (Gateway, SessionState, bool, Vec<OutboundFrame>) {
        let gateway = Gateway::new();
        let mut session = SessionState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let accepted = handshake(&gateway, &authenticator(), &mut session, token, &tx).await;
        let frames = drain(&mut rx);
        (gateway, session, accepted, frames)
    }

    #[tokio::test]
    async fn test_handshake_with_valid_token_registers() {
        let token = token_for(7, SECRET);
        let (gateway, session, accepted, frames) = open(Some(&token)).await;

        assert!(accepted);
        assert!(session.is_authenticated());
        assert!(gateway.is_registered(&session.connection_id));
        assert_eq!(gateway.rooms_of(&session.connection_id), vec!["user:7".to_string()]);
        assert_eq!(frames, vec![OutboundFrame::new(ChatEvent::Connected, Value::Null)]);
    }

    #[tokio::test]
    async fn test_handshake_without_token_is_rejected() {
        let (gateway, session, accepted, frames) = open(None).await;

        assert!(!accepted);
        assert!(!session.is_authenticated());
        assert!(gateway.rooms_of(&session.connection_id).is_empty());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "socketError");
    }

    #[tokio::test]
    async fn test_handshake_with_bad_signature_is_rejected() {
        let token = token_for(7, "some-other-secret-that-is-32-chars-long");
        let (gateway, session, accepted, frames) = open(Some(&token)).await;

        assert!(!accepted);
        assert!(!gateway.is_registered(&session.connection_id));
        assert!(gateway.rooms_of(&session.connection_id).is_empty());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "socketError");
    }

    #[tokio::test]
    async fn test_unauthenticated_frames_are_ignored() {
        let (gateway, session, _, _) = open(Some("not-a-jwt")).await;

        let join = dispatch_text(&gateway, &session, r#"{"event":"joinChat","data":"42"}"#);
        let leave = dispatch_text(&gateway, &session, r#"{"event":"disconnect"}"#);

        assert_eq!(join, RouteOutcome::Continue);
        assert_eq!(leave, RouteOutcome::Continue);
        assert!(gateway.rooms_of(&session.connection_id).is_empty());
        assert_eq!(gateway.room_size("chat:42"), 0);
    }

    #[tokio::test]
    async fn test_authenticated_frames_are_routed() {
        let token = token_for(7, SECRET);
        let (gateway, session, _, _) = open(Some(&token)).await;

        dispatch_text(&gateway, &session, r#"{"event":"joinChat","data":"42"}"#);
        assert_eq!(gateway.room_size("chat:42"), 1);
        assert_eq!(
            dispatch_text(&gateway, &session, "not json"),
            RouteOutcome::Continue
        );
        assert_eq!(
            dispatch_text(&gateway, &session, r#"{"event":"disconnect"}"#),
            RouteOutcome::Disconnect
        );
    }

    #[tokio::test]
    async fn test_queued_frames_flush_before_teardown() {
        let (sink, written) = futures::channel::mpsc::unbounded::<Message>();
        let (tx, rx) = mpsc::unbounded_channel();
        for event in [ChatEvent::Connected, ChatEvent::Typing, ChatEvent::StopTyping] {
            tx.send(OutboundFrame::new(event, Value::Null)).unwrap();
        }
        let writer = tokio::spawn(forward_frames(sink, rx));

        finish_writer(tx, writer).await;

        let events: Vec<String> = written
            .map(|msg| match msg {
                Message::Text(text) => {
                    let value: Value = serde_json::from_str(text.as_str()).unwrap();
                    value["event"].as_str().unwrap().to_string()
                }
                other => panic!("unexpected message {other:?}"),
            })
            .collect()
            .await;
        assert_eq!(events, vec!["connected", "typing", "stopTyping"]);
    }

    #[test]
    fn test_handshake_token_precedence() {
        let mut headers = HeaderMap::new();
        let query = SocketQuery {
            token: Some("from-query".into()),
        };
        assert_eq!(handshake_token(&headers, &query).as_deref(), Some("from-query"));

        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(handshake_token(&headers, &query).as_deref(), Some("from-header"));

        headers.insert(COOKIE, "accessToken=from-cookie".parse().unwrap());
        assert_eq!(handshake_token(&headers, &query).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_no_token_anywhere() {
        assert!(handshake_token(&HeaderMap::new(), &SocketQuery::default()).is_none());
    }
}
