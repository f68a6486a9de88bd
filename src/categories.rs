//! Category CRUD endpoints.
//!
//! Default categories are shared and read-only; users manage their own
//! custom set. Writes dispatch category events to the owner's connections.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::db::models::{Category, CATEGORY_COLUMNS};
use crate::response::{api_data, api_error, internal_error, ApiFailure, ApiResult};
use crate::state::AppState;
use crate::ws::events::EventName;

fn category_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Category> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        rusqlite::params![id],
        Category::from_row,
    )
}

/// Load a category and verify the user may modify it: it must exist, must
/// not be a default, and must belong to the user.
fn writable_category(
    conn: &Connection,
    id: &str,
    user_id: &str,
) -> Result<Category, ApiFailure> {
    let category = category_by_id(conn, id)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, "Category not found"))?;

    if category.is_default {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Cannot modify default categories",
        ));
    }
    if category.user_id.as_deref() != Some(user_id) {
        return Err(api_error(StatusCode::FORBIDDEN, "Not authorized"));
    }

    Ok(category)
}

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

// --- Handlers ---

/// GET /api/categories — Defaults plus the user's custom categories.
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<Category>> {
    let db = state.db.clone();

    let categories = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories \
                 WHERE is_default = 1 OR user_id = ?1 \
                 ORDER BY is_default DESC, name ASC"
            ))
            .map_err(|_| internal_error("Failed to get categories"))?;

        let categories: Vec<Category> = stmt
            .query_map(rusqlite::params![user.id], Category::from_row)
            .map_err(|_| internal_error("Failed to get categories"))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(categories)
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    Ok(api_data(categories))
}

/// POST /api/categories — Create a custom category.
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<crate::response::ApiData<Category>>), ApiFailure> {
    let name = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let color = req.color.filter(|c| !c.is_empty());
    let (Some(name), Some(color)) = (name, color) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Name and color are required",
        ));
    };

    let db = state.db.clone();
    let user_id = user.id.clone();

    let category = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let category_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO categories (id, user_id, name, color, is_default, created_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            rusqlite::params![category_id, user_id, name, color, now],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create category");
            internal_error("Failed to create category")
        })?;

        category_by_id(&conn, &category_id)
            .map_err(|_| internal_error("Failed to read category"))
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    state.dispatcher.dispatch(
        &user.id,
        EventName::CategoryCreated,
        serde_json::to_value(&category).unwrap_or_default(),
    );

    Ok((StatusCode::CREATED, api_data(category)))
}

/// PUT /api/categories/{id} — Rename or recolor an owned custom category.
pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    let db = state.db.clone();
    let user_id = user.id.clone();
    let id = category_id.clone();

    let category = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let existing = writable_category(&conn, &id, &user_id)?;

        let name = req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or(existing.name);
        let color = req.color.filter(|c| !c.is_empty()).unwrap_or(existing.color);

        conn.execute(
            "UPDATE categories SET name = ?1, color = ?2 WHERE id = ?3",
            rusqlite::params![name, color, id],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update category");
            internal_error("Failed to update category")
        })?;

        category_by_id(&conn, &id).map_err(|_| internal_error("Failed to read category"))
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    state.dispatcher.dispatch(
        &user.id,
        EventName::CategoryUpdated,
        serde_json::to_value(&category).unwrap_or_default(),
    );

    Ok(api_data(category))
}

/// DELETE /api/categories/{id} — Delete an owned custom category.
/// Expenses keep their rows; their category_id is set NULL by the schema.
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.clone();
    let user_id = user.id.clone();
    let id = category_id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        writable_category(&conn, &id, &user_id)?;

        conn.execute("DELETE FROM categories WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete category");
                internal_error("Failed to delete category")
            })?;

        Ok(())
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    state.dispatcher.dispatch(
        &user.id,
        EventName::CategoryDeleted,
        serde_json::json!({ "id": category_id }),
    );

    Ok(api_data(serde_json::json!({ "id": category_id })))
}
