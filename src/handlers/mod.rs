pub mod views;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ObservabilityError;
use crate::observe::ObservedError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden,
    /// Abort with an arbitrary status, like `abort(code)`.
    Status(StatusCode),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Status(code) => *code,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ObservabilityError> for AppError {
    fn from(e: ObservabilityError) -> Self {
        match e {
            ObservabilityError::InvalidArgument(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ObservedError for AppError {
    fn code(&self) -> Option<u16> {
        Some(self.status().as_u16())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg) | Self::Internal(msg) => msg,
            Self::Forbidden => "forbidden".into(),
            Self::Status(code) => code
                .canonical_reason()
                .unwrap_or("error")
                .to_owned(),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
