//! Request metrics for axum applications.
//!
//! Every handled request becomes one `views` measurement (status family,
//! timing, route, method, caller) that is written to InfluxDB, or appended to
//! an in-memory [`CaptureStore`] when running in capture (testing) mode.
//! Application code can emit its own measurements through
//! [`Observability::send`] and observe individual calls with
//! [`observe::observed`].
//!
//! ```ignore
//! let obs = Observability::new(config::load_from_file("observability.yaml")?);
//! let app = Router::new()
//!     .route("/login", get(login))
//!     .layer(axum::middleware::from_fn_with_state(obs, observe_requests));
//! ```

pub mod capture;
pub mod classify;
pub mod config;
pub mod current;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod measurement;
pub mod middleware;
pub mod observe;
pub mod scope;
pub mod server;
pub mod sink;

pub use capture::CaptureStore;
pub use dispatch::{Observability, RequestObservation, VIEWS};
pub use error::{ObservabilityError, Result};
pub use measurement::{FieldValue, Measurement};
pub use middleware::observe_requests;
pub use scope::ScopeHandle;
