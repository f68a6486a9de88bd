//! Expense CRUD endpoints.
//!
//! Every successful write dispatches the matching domain event to the
//! owner's WebSocket connections — after the DB write has committed, never
//! before, so a fetch triggered by the event always sees the new state.
//! A failed or missed notification never fails the underlying write.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::db::models::{Expense, EXPENSE_JOIN_SELECT};
use crate::response::{api_data, api_error, internal_error, ApiResult};
use crate::state::AppState;
use crate::ws::events::EventName;

/// Read back one expense with its category joined in.
pub(crate) fn expense_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Expense> {
    conn.query_row(
        &format!("{EXPENSE_JOIN_SELECT} WHERE e.id = ?1"),
        rusqlite::params![id],
        Expense::from_joined_row,
    )
}

fn owner_of(conn: &Connection, id: &str) -> Option<String> {
    conn.query_row(
        "SELECT user_id FROM expenses WHERE id = ?1",
        rusqlite::params![id],
        |row| row.get(0),
    )
    .ok()
}

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct ExpenseListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub category_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub category_id: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub expense_date: Option<String>,
    pub receipt_url: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    pub category_id: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub expense_date: Option<String>,
    pub receipt_url: Option<String>,
}

// --- Handlers ---

/// GET /api/expenses — Current user's expenses, newest first, with optional
/// date-range and category filters plus limit/offset pagination.
pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ExpenseListQuery>,
) -> ApiResult<Vec<Expense>> {
    let db = state.db.clone();

    let expenses = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let mut sql = format!("{EXPENSE_JOIN_SELECT} WHERE e.user_id = ?");
        let mut params: Vec<SqlValue> = vec![SqlValue::from(user.id)];

        if let Some(from) = query.from {
            sql.push_str(" AND e.expense_date >= ?");
            params.push(SqlValue::from(from));
        }
        if let Some(to) = query.to {
            sql.push_str(" AND e.expense_date <= ?");
            params.push(SqlValue::from(to));
        }
        if let Some(category_id) = query.category_id {
            sql.push_str(" AND e.category_id = ?");
            params.push(SqlValue::from(category_id));
        }

        sql.push_str(" ORDER BY e.expense_date DESC, e.created_at DESC LIMIT ? OFFSET ?");
        params.push(SqlValue::from(query.limit.max(0)));
        params.push(SqlValue::from(query.offset.max(0)));

        let mut stmt = stmt_or_internal(&conn, &sql)?;
        let expenses: Vec<Expense> = stmt
            .query_map(rusqlite::params_from_iter(params), Expense::from_joined_row)
            .map_err(|_| internal_error("Failed to get expenses"))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(expenses)
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    Ok(api_data(expenses))
}

fn stmt_or_internal<'a>(
    conn: &'a Connection,
    sql: &str,
) -> Result<rusqlite::Statement<'a>, crate::response::ApiFailure> {
    conn.prepare(sql).map_err(|e| {
        tracing::error!(error = %e, "Failed to prepare expense query");
        internal_error("Failed to get expenses")
    })
}

/// POST /api/expenses — Create an expense and notify the owner's connections.
pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<crate::response::ApiData<Expense>>), crate::response::ApiFailure> {
    let category_id = req.category_id.filter(|c| !c.is_empty());
    let expense_date = req.expense_date.filter(|d| !d.is_empty());
    let (Some(category_id), Some(amount), Some(expense_date)) =
        (category_id, req.amount, expense_date)
    else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing required fields"));
    };

    if amount <= 0.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Amount must be greater than 0",
        ));
    }

    let db = state.db.clone();
    let user_id = user.id.clone();

    let expense = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let category_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM categories WHERE id = ?1",
                rusqlite::params![category_id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);

        if !category_exists {
            return Err(api_error(StatusCode::BAD_REQUEST, "Category not found"));
        }

        let expense_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO expenses (id, user_id, category_id, amount, description, \
             expense_date, receipt_url, attachment_type, attachment_data, ai_processed, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
            rusqlite::params![
                expense_id,
                user_id,
                category_id,
                amount,
                req.description,
                expense_date,
                req.receipt_url,
                req.attachment_type,
                req.attachment_data,
                now
            ],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create expense");
            internal_error("Failed to create expense")
        })?;

        expense_by_id(&conn, &expense_id).map_err(|_| internal_error("Failed to read expense"))
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    state.dispatcher.dispatch(
        &user.id,
        EventName::ExpenseCreated,
        serde_json::to_value(&expense).unwrap_or_default(),
    );

    Ok((StatusCode::CREATED, api_data(expense)))
}

/// PUT /api/expenses/{id} — Update an owned expense.
pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<String>,
    Json(req): Json<UpdateExpenseRequest>,
) -> ApiResult<Expense> {
    if let Some(amount) = req.amount {
        if amount <= 0.0 {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Amount must be greater than 0",
            ));
        }
    }

    let db = state.db.clone();
    let user_id = user.id.clone();
    let id = expense_id.clone();

    let expense = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        // Ownership check; a foreign expense looks like a missing one.
        match owner_of(&conn, &id) {
            Some(owner) if owner == user_id => {}
            _ => return Err(api_error(StatusCode::NOT_FOUND, "Expense not found")),
        }

        let existing =
            expense_by_id(&conn, &id).map_err(|_| internal_error("Failed to read expense"))?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE expenses SET category_id = ?1, amount = ?2, description = ?3, \
             expense_date = ?4, receipt_url = ?5, updated_at = ?6 WHERE id = ?7",
            rusqlite::params![
                req.category_id.or(existing.category_id),
                req.amount.unwrap_or(existing.amount),
                req.description.or(existing.description),
                req.expense_date.unwrap_or(existing.expense_date),
                req.receipt_url.or(existing.receipt_url),
                now,
                id
            ],
        )
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update expense");
            internal_error("Failed to update expense")
        })?;

        expense_by_id(&conn, &id).map_err(|_| internal_error("Failed to read expense"))
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    state.dispatcher.dispatch(
        &user.id,
        EventName::ExpenseUpdated,
        serde_json::to_value(&expense).unwrap_or_default(),
    );

    Ok(api_data(expense))
}

/// DELETE /api/expenses/{id} — Delete an owned expense.
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.clone();
    let user_id = user.id.clone();
    let id = expense_id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        match owner_of(&conn, &id) {
            Some(owner) if owner == user_id => {}
            _ => return Err(api_error(StatusCode::NOT_FOUND, "Expense not found")),
        }

        conn.execute("DELETE FROM expenses WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete expense");
                internal_error("Failed to delete expense")
            })?;

        Ok(())
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    state.dispatcher.dispatch(
        &user.id,
        EventName::ExpenseDeleted,
        serde_json::json!({ "id": expense_id }),
    );

    Ok(api_data(serde_json::json!({ "id": expense_id })))
}
