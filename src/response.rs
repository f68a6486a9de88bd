//! API response envelope: `{ "success": true, "data": ... }` on success,
//! `{ "success": false, "error": "..." }` on failure.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiData<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Handler result type: success envelope or (status, error envelope).
pub type ApiResult<T> = Result<Json<ApiData<T>>, ApiFailure>;

pub fn api_data<T: Serialize>(data: T) -> Json<ApiData<T>> {
    Json(ApiData {
        success: true,
        data,
    })
}

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ApiError {
            success: false,
            error: message.into(),
        }),
    )
}

/// Shorthand for the commonest failure: a DB task that errored.
pub fn internal_error(context: &str) -> ApiFailure {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context)
}
