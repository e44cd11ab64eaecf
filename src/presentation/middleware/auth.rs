//! Authentication Middleware
//!
//! Resolves the access token of a request to a live user. The token is read
//! from the `Authorization: Bearer` header, falling back to the
//! `accessToken` cookie.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::application::services::AuthError;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Authenticated user extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

/// Bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Access token cookie.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
}

/// Authentication middleware that validates access tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).or_else(|| cookie_token(request.headers()));

    let user = state
        .authenticator
        .authenticate(token.as_deref())
        .await
        .map_err(|e| match e {
            AuthError::MissingToken => AppError::Unauthorized("Unauthorized request".into()),
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::TokenExpired => AppError::Unauthorized("Token expired".into()),
            AuthError::InvalidToken | AuthError::UserNotFound => {
                AppError::Unauthorized("Invalid access token".into())
            }
        })?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        username: user.username,
    });

    Ok(next.run(request).await)
}
