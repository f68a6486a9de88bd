//! Bearer-token authentication middleware.
//!
//! The session token is the user's id (issued at login); the middleware
//! resolves it against the users table and stores the row in request
//! extensions for the `CurrentUser` extractor. The push channel relies on
//! the same property: a bare user id is the credential.

use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::db::models::{User, USER_COLUMNS};
use crate::response::api_error;
use crate::state::AppState;

/// The authenticated user for this request, inserted by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Middleware: resolve `Authorization: Bearer <token>` to a user row and
/// inject it into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return api_error(StatusCode::UNAUTHORIZED, "No token provided").into_response();
    };

    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().ok()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![token],
            User::from_row,
        )
        .ok()
    })
    .await
    .ok()
    .flatten();

    match user {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        None => api_error(StatusCode::UNAUTHORIZED, "Invalid token").into_response(),
    }
}
