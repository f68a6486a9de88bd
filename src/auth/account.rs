//! Profile and account endpoints for the authenticated user.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::middleware::CurrentUser;
use crate::db::models::{User, USER_COLUMNS};
use crate::response::{api_data, api_error, internal_error, ApiResult};
use crate::state::AppState;

/// GET /api/auth/me — Current user profile.
pub async fn get_me(CurrentUser(user): CurrentUser) -> ApiResult<User> {
    Ok(api_data(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub business_type: Option<String>,
    pub occupation: Option<String>,
    pub monthly_budget: Option<f64>,
    pub onboarding_completed: Option<bool>,
    pub dark_mode: Option<bool>,
}

/// PUT /api/auth/profile — Update profile fields; absent fields are left as-is.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    let db = state.db.clone();

    let updated = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET full_name = ?1, avatar_url = ?2, business_type = ?3, \
             occupation = ?4, monthly_budget = ?5, onboarding_completed = ?6, \
             dark_mode = ?7, updated_at = ?8 WHERE id = ?9",
            rusqlite::params![
                req.full_name.or(user.full_name),
                req.avatar_url.or(user.avatar_url),
                req.business_type.or(user.business_type),
                req.occupation.or(user.occupation),
                req.monthly_budget.unwrap_or(user.monthly_budget),
                req.onboarding_completed.unwrap_or(user.onboarding_completed),
                req.dark_mode.unwrap_or(user.dark_mode),
                now,
                user.id
            ],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update profile");
            internal_error("Failed to update profile")
        })?;

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![user.id],
            User::from_row,
        )
        .map_err(|_| internal_error("Failed to read user"))
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    Ok(api_data(updated))
}

/// POST /api/auth/logout — Sessions are client-held, nothing to revoke.
pub async fn logout() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "message": "Logged out" }))
}

/// DELETE /api/auth/account — Delete the user and all their data.
/// Expenses and custom categories go first (foreign keys), then the user row.
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<serde_json::Value> {
    let db = state.db.clone();
    let user_id = user.id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        conn.execute(
            "DELETE FROM expenses WHERE user_id = ?1",
            rusqlite::params![user_id],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to delete expenses");
            internal_error("Failed to delete account")
        })?;

        conn.execute(
            "DELETE FROM categories WHERE user_id = ?1 AND is_default = 0",
            rusqlite::params![user_id],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to delete categories");
            internal_error("Failed to delete account")
        })?;

        let rows = conn
            .execute("DELETE FROM users WHERE id = ?1", rusqlite::params![user_id])
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete user");
                internal_error("Failed to delete account")
            })?;

        if rows == 0 {
            return Err(api_error(StatusCode::NOT_FOUND, "User not found"));
        }

        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    Ok(api_data(
        serde_json::json!({ "message": "Account deleted successfully" }),
    ))
}
