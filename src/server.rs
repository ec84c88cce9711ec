use axum::{
    extract::Request,
    middleware::{self as axum_mw, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::capture::stream;
use crate::dispatch::Observability;
use crate::handlers;
use crate::identity::{AttributeCaller, CurrentCaller};
use crate::middleware::observe_requests;
use crate::observe::observed;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub obs: Observability,
}

/// Header the demo auth layer trusts as the caller's login.
pub const USER_HEADER: &str = "x-user";

/// Builds the demo `Router`: observed routes, capture inspection, middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let obs = state.obs.clone();

    Router::new()
        // ── Observed demo endpoints ─────────────────────────────
        .route("/login", get(handlers::views::login))
        .route("/error", get(handlers::views::error))
        .route("/heartbeat", post(handlers::views::heartbeat))
        .route("/jobs/:name", post(handlers::views::enqueue_job))
        .route(
            "/checkout/:amount",
            get(observed(obs.clone(), "checkout", handlers::views::checkout)),
        )
        // ── Capture inspection ──────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        .route("/api/metrics/series/:name", get(stream::get_series))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(obs, observe_requests))
        .layer(axum_mw::from_fn(header_caller))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Stand-in auth layer: trusts `x-user` and exposes it as the current caller.
/// Must sit outside `observe_requests` so the caller is visible to it.
async fn header_caller(mut req: Request, next: Next) -> Response {
    let login = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(login) = login {
        let caller = AttributeCaller::new(format!("<User {login}>")).with("login", login);
        req.extensions_mut().insert(CurrentCaller::new(caller));
    }

    next.run(req).await
}
