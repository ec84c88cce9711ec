use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::current;
use crate::server::AppState;

use super::AppError;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub errorcode: Option<u16>,
}

// ─── GET /login ──────────────────────────────────────────────────

pub async fn login(Query(q): Query<LoginQuery>) -> Result<StatusCode, AppError> {
    if q.username.as_deref() == Some("bad") {
        return Err(AppError::Forbidden);
    }
    Ok(StatusCode::OK)
}

// ─── GET /error ──────────────────────────────────────────────────

pub async fn error(Query(q): Query<ErrorQuery>) -> Result<StatusCode, AppError> {
    match q.errorcode {
        None => Ok(StatusCode::OK),
        Some(code) => {
            let status = StatusCode::from_u16(code)
                .map_err(|_| AppError::BadRequest(format!("invalid status code {code}")))?;
            Err(AppError::Status(status))
        }
    }
}

// ─── POST /heartbeat ─────────────────────────────────────────────

/// Manual emission through the explicit pipeline handle.
pub async fn heartbeat(State(state): State<Arc<AppState>>) -> Result<StatusCode, AppError> {
    state
        .obs
        .send("heartbeat", [("trigger", "manual")], [("alive", true)])
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── POST /jobs/:name ────────────────────────────────────────────

/// Manual emission from code that only has the ambient request context.
pub async fn enqueue_job(Path(name): Path<String>) -> Result<StatusCode, AppError> {
    current::send("jobs", [("job", name)], [("enqueued", 1i64)]).await?;
    Ok(StatusCode::ACCEPTED)
}

// ─── GET /checkout/:amount ───────────────────────────────────────

/// Observed per call (see `server::create_router`).
pub async fn checkout(Path(amount): Path<u32>) -> Result<StatusCode, AppError> {
    if amount > 1_000 {
        return Err(AppError::Status(StatusCode::PAYMENT_REQUIRED));
    }
    Ok(StatusCode::CREATED)
}
