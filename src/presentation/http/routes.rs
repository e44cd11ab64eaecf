//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use tower_http::services::ServeDir;

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, metrics_middleware};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Headroom on top of the attachment bytes for the text fields and
/// multipart framing.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let images_dir = state.settings.uploads.local_dir.clone();

    Router::new()
        .nest("/api/v1/chat-app", api_routes(state.clone()))
        // WebSocket endpoint
        .route("/socket", get(ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        // Uploaded attachments
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API routes, all protected
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/chats", chat_routes())
        .nest("/messages", message_routes(&state))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Chat routes
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::chat::list_chats))
        .route("/users", get(handlers::chat::search_available_users))
        .route(
            "/c/{receiver_id}",
            post(handlers::chat::get_or_create_direct_chat),
        )
        .route("/group", post(handlers::chat::create_group_chat))
        .route(
            "/group/{chat_id}",
            get(handlers::chat::get_group_chat_details)
                .patch(handlers::chat::rename_group_chat)
                .delete(handlers::chat::delete_group_chat),
        )
        .route(
            "/group/{chat_id}/{participant_id}",
            post(handlers::chat::add_participant).delete(handlers::chat::remove_participant),
        )
        .route(
            "/leave/group/{chat_id}",
            delete(handlers::chat::leave_group_chat),
        )
        .route("/remove/{chat_id}", delete(handlers::chat::delete_direct_chat))
}

/// Message routes
fn message_routes(state: &AppState) -> Router<AppState> {
    let uploads = &state.settings.uploads;
    let body_limit = uploads.max_file_size * uploads.max_files_per_message + FORM_OVERHEAD;

    Router::new()
        .route(
            "/{chat_id}",
            get(handlers::message::list_messages).post(handlers::message::send_message),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}
