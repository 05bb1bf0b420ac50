//! Error and success response envelopes
//!
//! Every handler failure leaves the service as the same JSON shape, with
//! a machine-readable code, a request id for support, and a retry hint.

use crate::error::{AppError, ErrorCode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

/// Wire shape of every error the API returns
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub message: String,
    pub request_id: Option<String>,
    pub timestamp: String,
    pub retryable: bool,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: error.error_code(),
            message: error.user_message(),
            request_id: error.request_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            retryable: error.is_retryable(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server faults are ours, client faults are theirs
        if status.is_server_error() {
            tracing::error!(
                error = ?self,
                code = ?self.error_code(),
                request_id = ?self.request_id,
                status = status.as_u16(),
                "Request failed"
            );
        } else {
            tracing::warn!(
                code = ?self.error_code(),
                request_id = ?self.request_id,
                status = status.as_u16(),
                "Request rejected"
            );
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Wrap a payload in the standard success envelope
///
/// # Example
/// ```no_run
/// use trashvalue_backend::middleware::error::success_response;
/// use serde_json::json;
///
/// let response = success_response(json!({ "balance": "25000.00", "points": "1200.00" }));
/// ```
pub fn success_response<T: Serialize>(data: T) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": data,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Success envelope carrying pagination metadata alongside the rows
pub fn success_response_with_meta<T: Serialize, M: Serialize>(
    data: T,
    meta: M,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": data,
        "meta": meta,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
