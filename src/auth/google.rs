//! Google sign-in.
//!
//! Two login flows, matching the two client shapes:
//! - POST /api/auth/google: the web widget posts an ID-token credential,
//!   verified against Google's tokeninfo endpoint.
//! - GET /api/auth/google -> GET /api/auth/google/callback: server-side
//!   redirect flow for clients without the widget; the authorization code is
//!   exchanged for an access token and the profile fetched from userinfo.
//!
//! Both flows create the user row on first login and hand the user id back
//! as the session token.

use axum::extract::Query;
use axum::response::Redirect;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::{User, USER_COLUMNS};
use crate::response::{api_data, api_error, internal_error, ApiFailure, ApiResult};
use crate::state::AppState;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub credential: String,
}

/// Relevant claims from Google's tokeninfo response.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: String,
    aud: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

/// Load the user row, creating it on first login.
async fn upsert_google_user(
    state: &AppState,
    id: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
) -> Result<User, ApiFailure> {
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let existing = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                rusqlite::params![id],
                User::from_row,
            )
            .ok();

        if let Some(user) = existing {
            return Ok(user);
        }

        // First login: create the user
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (id, email, full_name, avatar_url, monthly_budget, \
             onboarding_completed, dark_mode, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?5)",
            rusqlite::params![id, email, name, picture, now],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create user");
            internal_error("Failed to create user")
        })?;

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![id],
            User::from_row,
        )
        .map_err(|_| internal_error("Failed to read user"))
    })
    .await
    .map_err(|_| internal_error("Task join"))?
}

/// POST /api/auth/google — Verify a Google credential and open a session.
pub async fn google_login(
    State(state): State<AppState>,
    Json(req): Json<GoogleLoginRequest>,
) -> ApiResult<LoginResponse> {
    if req.credential.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No credential provided"));
    }
    if state.google_client_id.is_empty() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Google login not configured",
        ));
    }

    // Let Google validate signature and expiry; we check the audience.
    let response = state
        .http
        .get(TOKENINFO_URL)
        .query(&[("id_token", req.credential.as_str())])
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "tokeninfo request failed");
            api_error(StatusCode::BAD_GATEWAY, "Token verification unavailable")
        })?;

    if !response.status().is_success() {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid token"));
    }

    let info: TokenInfo = response
        .json()
        .await
        .map_err(|_| api_error(StatusCode::UNAUTHORIZED, "Invalid token payload"))?;

    if info.aud != state.google_client_id {
        tracing::warn!(aud = %info.aud, "Token audience mismatch");
        return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid token"));
    }

    let Some(email) = info.email.filter(|e| !e.is_empty()) else {
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Missing user info from token",
        ));
    };

    let user = upsert_google_user(&state, info.sub, email, info.name, info.picture).await?;

    let token = user.id.clone();
    Ok(api_data(LoginResponse { user, token }))
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfigResponse {
    pub web_client_id: String,
    pub android_client_id: String,
}

/// GET /api/auth/config — OAuth client ids for mobile apps. Safe to expose;
/// never includes the client secret.
pub async fn auth_config(State(state): State<AppState>) -> ApiResult<AuthConfigResponse> {
    Ok(api_data(AuthConfigResponse {
        web_client_id: state.google_client_id.clone(),
        android_client_id: state.google_android_client_id.clone(),
    }))
}

/// The redirect URI registered in the Google console.
fn callback_uri(state: &AppState) -> String {
    format!("{}/api/auth/google/callback", state.public_url)
}

/// GET /api/auth/google — Send the browser to Google's consent screen.
pub async fn oauth_redirect(State(state): State<AppState>) -> Result<Redirect, ApiFailure> {
    if state.google_client_id.is_empty() || state.google_client_secret.is_empty() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Google login not configured",
        ));
    }

    let redirect_uri = callback_uri(&state);
    let url = reqwest::Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", state.google_client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_type", "code"),
            (
                "scope",
                "https://www.googleapis.com/auth/userinfo.email \
                 https://www.googleapis.com/auth/userinfo.profile",
            ),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|_| internal_error("Failed to build consent URL"))?;

    Ok(Redirect::to(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct OauthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: String,
}

/// Profile fields from Google's userinfo endpoint.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// GET /api/auth/google/callback — Exchange the authorization code, upsert
/// the user, and hand the session token to the frontend. The browser is
/// mid-redirect here, so every failure sends it back to the login page with
/// an error tag instead of rendering an API error.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OauthCallbackQuery>,
) -> Redirect {
    let login_error =
        |reason: &str| Redirect::to(&format!("{}/login?error={}", state.cors_origin, reason));

    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Google OAuth consent denied");
        return login_error("oauth_denied");
    }
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return login_error("no_code");
    };
    if state.google_client_id.is_empty() || state.google_client_secret.is_empty() {
        return login_error("oauth_unconfigured");
    }

    let redirect_uri = callback_uri(&state);
    let exchange = state
        .http
        .post(TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("client_id", state.google_client_id.as_str()),
            ("client_secret", state.google_client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await;

    let token = match exchange {
        Ok(resp) if resp.status().is_success() => {
            match resp.json::<CodeExchangeResponse>().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable code exchange response");
                    return login_error("callback_failed");
                }
            }
        }
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), "Code exchange rejected");
            return login_error("callback_failed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Code exchange request failed");
            return login_error("callback_failed");
        }
    };

    let info = match state
        .http
        .get(USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => match resp.json::<GoogleUserInfo>().await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable userinfo response");
                return login_error("callback_failed");
            }
        },
        _ => return login_error("callback_failed"),
    };

    let Some(email) = info.email.filter(|e| !e.is_empty()) else {
        return login_error("callback_failed");
    };

    match upsert_google_user(&state, info.id, email, info.name, info.picture).await {
        Ok(user) => Redirect::to(&format!(
            "{}/auth/callback?token={}",
            state.cors_origin, user.id
        )),
        Err(_) => login_error("create_failed"),
    }
}
