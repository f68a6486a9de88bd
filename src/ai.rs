//! Receipt OCR passthrough.
//!
//! The client uploads a photographed receipt as a base64 data URL; we forward
//! the bytes to the configured OCR webhook and map its free-text category
//! back to a category id. Extraction quality is entirely the webhook's
//! problem — this layer only adapts formats.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::db::models::Expense;
use crate::expenses::expense_by_id;
use crate::response::{api_data, api_error, internal_error, ApiResult};
use crate::state::AppState;
use crate::ws::events::EventName;

/// OCR runs can take a while on large receipts.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(60);

const FALLBACK_CATEGORY: &str = "lainnya";

#[derive(Debug, Deserialize)]
pub struct AnalyzeReceiptRequest {
    pub image: Option<String>,
    pub filename: Option<String>,
}

/// Fields returned by the OCR webhook.
#[derive(Debug, Deserialize)]
struct WebhookResult {
    #[serde(default)]
    toko: Option<String>,
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    kategori: Option<String>,
    #[serde(default)]
    tanggal: Option<String>,
    #[serde(default)]
    alamat: Option<String>,
    #[serde(default)]
    catatan: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeReceiptResponse {
    pub toko: String,
    pub total: f64,
    pub kategori: String,
    pub category_id: Option<String>,
    pub tanggal: String,
    pub alamat: String,
    pub catatan: String,
    pub confidence: f64,
}

/// Split a data URL (`data:image/png;base64,...`) into bytes and mime type.
/// Bare base64 without the header defaults to JPEG.
fn parse_data_url(input: &str) -> Option<(Vec<u8>, String)> {
    let (mime, data) = match input.split_once(',') {
        Some((header, data)) => {
            let mime = header
                .strip_prefix("data:")
                .and_then(|h| h.split(';').next())
                .unwrap_or("image/jpeg");
            (mime.to_string(), data)
        }
        None => ("image/jpeg".to_string(), input),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .ok()?;
    Some((bytes, mime))
}

/// Map the webhook's category name onto a seeded default category id.
/// Exact normalized match first, then substring overlap, then "Lainnya".
fn resolve_category_id(kategori: &str, defaults: &[(String, String)]) -> Option<String> {
    let wanted = normalize(kategori);

    for (id, name) in defaults {
        if normalize(name) == wanted {
            return Some(id.clone());
        }
    }

    for (id, name) in defaults {
        let normalized = normalize(name);
        if normalized.contains(&wanted) || wanted.contains(&normalized) {
            return Some(id.clone());
        }
    }

    defaults
        .iter()
        .find(|(_, name)| normalize(name) == FALLBACK_CATEGORY)
        .map(|(id, _)| id.clone())
}

fn normalize(name: &str) -> String {
    // The webhook tends to answer "makanan" for the seeded
    // "Makanan & Minuman" category.
    name.to_lowercase()
        .replace("makanan & minuman", "makanan")
        .replace([' ', '&'], "")
}

/// POST /api/ai/analyze-receipt — Forward a receipt image to the OCR webhook
/// and return the extracted expense fields.
pub async fn analyze_receipt(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<AnalyzeReceiptRequest>,
) -> ApiResult<AnalyzeReceiptResponse> {
    let Some(image) = req.image.filter(|i| !i.is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "No image provided"));
    };
    if state.webhook_url.is_empty() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "AI service not configured",
        ));
    }

    let Some((bytes, mime)) = parse_data_url(&image) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid image encoding"));
    };

    let extension = mime.split('/').nth(1).unwrap_or("jpg");
    let filename = req
        .filename
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| format!("receipt.{extension}"));

    tracing::info!(bytes = bytes.len(), filename = %filename, "Forwarding receipt to OCR webhook");

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(filename)
        .mime_str(&mime)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid image type"))?;
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = state
        .http
        .post(&state.webhook_url)
        .multipart(form)
        .timeout(WEBHOOK_TIMEOUT)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "OCR webhook request failed");
            api_error(StatusCode::BAD_GATEWAY, "Failed to connect to AI service")
        })?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "OCR webhook returned an error");
        return Err(api_error(StatusCode::BAD_GATEWAY, "AI processing failed"));
    }

    let result: WebhookResult = response
        .json()
        .await
        .map_err(|_| api_error(StatusCode::BAD_GATEWAY, "Unreadable AI response"))?;

    if let Some(error) = result.error {
        return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, error));
    }

    // Map the free-text category onto the seeded defaults.
    let db = state.db.clone();
    let defaults = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;
        let mut stmt = conn
            .prepare("SELECT id, name FROM categories WHERE is_default = 1")
            .map_err(|_| internal_error("Failed to load categories"))?;
        let defaults: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|_| internal_error("Failed to load categories"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(defaults)
    })
    .await
    .map_err(|_| internal_error("Task join"))??;

    let kategori = result
        .kategori
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());
    let category_id = resolve_category_id(&kategori, &defaults);

    Ok(api_data(AnalyzeReceiptResponse {
        toko: result.toko.unwrap_or_default(),
        total: result.total.unwrap_or(0.0),
        kategori,
        category_id,
        tanggal: result
            .tanggal
            .unwrap_or_else(|| Utc::now().date_naive().to_string()),
        alamat: result.alamat.unwrap_or_default(),
        catatan: result.catatan.unwrap_or_default(),
        confidence: result.confidence.unwrap_or(0.8),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SaveExpenseRequest {
    pub category_id: Option<String>,
    pub amount: Option<f64>,
    pub expense_date: Option<String>,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub attachment_type: Option<String>,
    pub attachment_data: Option<String>,
}

/// POST /api/ai/save-expense — Persist an AI-extracted expense.
pub async fn save_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SaveExpenseRequest>,
) -> ApiResult<Expense> {
    let amount = req.amount.unwrap_or(0.0);
    if amount <= 0.0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid amount"));
    }

    let db = state.db.clone();
    let user_id = user.id.clone();
    let expense_date = req
        .expense_date
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| Utc::now().date_naive().to_string());

    let expense = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| internal_error("DB lock"))?;

        let expense_id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO expenses (id, user_id, category_id, amount, description, \
             expense_date, receipt_url, attachment_type, attachment_data, ai_processed, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)",
            rusqlite::params![
                expense_id,
                user_id,
                req.category_id,
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
            tracing::error!(error = %e, "Failed to save expense");
            internal_error("Failed to save expense")
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

    Ok(api_data(expense))
}
