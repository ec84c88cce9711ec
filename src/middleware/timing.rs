use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::current;
use crate::dispatch::{Observability, RequestObservation};
use crate::identity::{resolve_identity, CurrentCaller};
use crate::scope::ScopeHandle;

/// Request-lifecycle hook. Install with
/// `axum::middleware::from_fn_with_state(obs, observe_requests)`.
///
/// Before the handler: resolve the caller from a [`CurrentCaller`] extension
/// (put there by an outer auth layer, if any), open a fresh [`ScopeHandle`]
/// and start the clock. The handler runs with the scope installed as
/// the ambient context. After it: classify the status and emit a `views`
/// measurement. The response is returned as-is whatever the sink does.
pub async fn observe_requests(
    State(obs): State<Observability>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();

    let identity = resolve_identity(
        req.extensions()
            .get::<CurrentCaller>()
            .map(|caller| caller.0.as_ref()),
    );
    let scope = ScopeHandle::with_identity(identity);

    let start = Instant::now();

    let response = current::scope(obs.clone(), scope.clone(), next.run(req)).await;
    let elapsed = start.elapsed();
    let status = response.status().as_u16();

    tracing::trace!(status, %method, %path, us = elapsed.as_micros() as u64, "request observed");

    obs.observe_request(
        &scope,
        RequestObservation {
            method,
            path,
            status,
            elapsed,
        },
    )
    .await;

    response
}
