//! Demo server: observed endpoints plus capture inspection.
//!
//! Config is read from `$OBSERVABILITY_CONFIG` (default `observability.yaml`);
//! a missing file falls back to defaults. Logging honours `RUST_LOG`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use axum_observability::config::{self, ObservabilityConfig};
use axum_observability::server::{self, AppState};
use axum_observability::Observability;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("OBSERVABILITY_CONFIG").unwrap_or_else(|_| "observability.yaml".into());
    let cfg = config::load_from_file(&path).unwrap_or_else(|e| {
        tracing::warn!(%path, error = %e, "config not loaded, using defaults");
        ObservabilityConfig::default()
    });

    let listen: SocketAddr = std::env::var("LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()
        .expect("LISTEN must be a valid SocketAddr");

    let obs = Observability::new(cfg);
    tracing::info!(
        hostname = obs.hostname(),
        testing = obs.is_testing(),
        "observability pipeline ready"
    );

    let app = server::create_router(Arc::new(AppState { obs }));

    tracing::info!(%listen, "observability-demo starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .expect("failed to bind");

    axum::serve(listener, app).await.expect("server exited with error");
}
