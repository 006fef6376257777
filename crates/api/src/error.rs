//! Error to HTTP response mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use bahi_core::invoice::InvoiceError;
use bahi_shared::AppError;

/// Error returned by route handlers.
///
/// Rendered as `{"error": <code>, "message": <text>}` with the matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code();
        let message = if status.is_server_error() {
            error!(error = %err, code, "invoice operation failed");
            "An internal error occurred".to_string()
        } else {
            err.to_string()
        };
        Self {
            status,
            code,
            message,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if err.is_server_error() {
            error!(error = %err, "request failed");
            "An internal error occurred".to_string()
        } else {
            err.to_string()
        };
        Self {
            status,
            code: err.error_code(),
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}
