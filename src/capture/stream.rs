use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::store::CaptureSnapshot;
use crate::measurement::Measurement;
use crate::server::AppState;

// ─── GET /api/metrics ────────────────────────────────────────────
/// Single JSON summary of everything captured so far.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<CaptureSnapshot> {
    Json(state.obs.capture().snapshot())
}

// ─── GET /api/metrics/series/:name ───────────────────────────────
/// Captured measurements for one name, in emission order.

pub async fn get_series(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<Vec<Measurement>> {
    Json(state.obs.capture().get(&name))
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint: a `CaptureSnapshot` every 500 ms.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.obs.capture().snapshot();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
