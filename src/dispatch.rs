//! The measurement pipeline: build, classify, route.
//!
//! In capture mode every measurement is appended to the [`CaptureStore`]. In
//! live mode it is written once to the scope's sink connection; a failing sink
//! is logged and otherwise ignored so a metrics outage never affects the
//! request being observed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::CaptureStore;
use crate::classify::classify;
use crate::config::ObservabilityConfig;
use crate::current;
use crate::error::{ObservabilityError, Result};
use crate::measurement::{Clock, FieldValue, Fields, Measurement, SystemClock};
use crate::scope::ScopeHandle;
use crate::sink::{InfluxDbConnector, SinkConnector};

/// Measurement name used for automatic per-request observations.
pub const VIEWS: &str = "views";

/// What the request-lifecycle hook hands to the core once a response exists.
#[derive(Debug, Clone)]
pub struct RequestObservation {
    pub method: String,
    /// Raw request path, also matched against the ignored-route list.
    pub path: String,
    pub status: u16,
    pub elapsed: Duration,
}

/// Cheaply cloneable handle to the pipeline.
#[derive(Clone)]
pub struct Observability {
    inner: Arc<Inner>,
}

struct Inner {
    hostname: String,
    ignored_routes: Vec<String>,
    testing: AtomicBool,
    capture: Arc<CaptureStore>,
    connector: Arc<dyn SinkConnector>,
    clock: Arc<dyn Clock>,
}

impl Observability {
    pub fn new(config: ObservabilityConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ObservabilityConfig) -> ObservabilityBuilder {
        ObservabilityBuilder {
            config,
            clock: None,
            connector: None,
            capture: None,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.inner.hostname
    }

    pub fn capture(&self) -> &Arc<CaptureStore> {
        &self.inner.capture
    }

    /// Re-read on every dispatch.
    pub fn is_testing(&self) -> bool {
        self.inner.testing.load(Ordering::Relaxed)
    }

    pub fn set_testing(&self, testing: bool) {
        self.inner.testing.store(testing, Ordering::Relaxed);
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.inner
            .ignored_routes
            .iter()
            .any(|route| path.contains(route.as_str()))
    }

    pub(crate) fn same_pipeline(&self, other: &Observability) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ─── Message builder ─────────────────────────────────────────

    pub fn base_message(&self, name: &str, identity: Option<&str>) -> Result<Measurement> {
        Measurement::build(name, &self.inner.hostname, identity, self.inner.clock.as_ref())
    }

    // ─── Dispatcher ──────────────────────────────────────────────

    /// Route one measurement. Never fails: sink errors are logged and dropped.
    pub async fn dispatch(&self, scope: &ScopeHandle, measurement: Measurement) {
        if self.is_testing() {
            tracing::debug!(measurement = %measurement.name, "captured");
            self.inner.capture.record(measurement);
            return;
        }

        match self.write_live(scope, &measurement).await {
            Ok(()) => tracing::debug!(measurement = %measurement.name, "written to sink"),
            Err(e) => tracing::warn!(
                measurement = %measurement.name,
                scope = %scope.id(),
                error = %e,
                "metrics sink write failed, measurement dropped"
            ),
        }
    }

    async fn write_live(&self, scope: &ScopeHandle, measurement: &Measurement) -> Result<()> {
        let conn = scope.connection(self.inner.connector.as_ref())?;
        conn.write_points(std::slice::from_ref(measurement)).await
    }

    // ─── Manual emission ─────────────────────────────────────────

    /// Emit a named measurement within an explicit scope.
    ///
    /// Fails with `InvalidArgument` when `fields` is empty; nothing is
    /// dispatched in that case.
    pub async fn send_in<T, K, V, F, FK, FV>(
        &self,
        scope: &ScopeHandle,
        name: &str,
        tags: T,
        fields: F,
    ) -> Result<()>
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        F: IntoIterator<Item = (FK, FV)>,
        FK: Into<String>,
        FV: Into<FieldValue>,
    {
        let fields: Fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if fields.is_empty() {
            return Err(ObservabilityError::InvalidArgument(format!(
                "measurement {name:?} needs at least one field"
            )));
        }

        let identity = scope.identity();
        let mut message = self.base_message(name, identity.as_deref())?;
        message.merge_tags(tags).merge_fields(fields);

        self.dispatch(scope, message).await;
        Ok(())
    }

    /// Emit a named measurement, reusing the current request's scope when
    /// called from inside an observed request.
    pub async fn send<T, K, V, F, FK, FV>(&self, name: &str, tags: T, fields: F) -> Result<()>
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
        F: IntoIterator<Item = (FK, FV)>,
        FK: Into<String>,
        FV: Into<FieldValue>,
    {
        let scope = self.ambient_scope();
        self.send_in(&scope, name, tags, fields).await
    }

    pub(crate) fn ambient_scope(&self) -> ScopeHandle {
        current::get()
            .filter(|cur| cur.obs.same_pipeline(self))
            .map(|cur| cur.scope)
            .unwrap_or_default()
    }

    // ─── Request lifecycle ───────────────────────────────────────

    /// The "after" half of the request hook: classify, time and emit under
    /// [`VIEWS`], unless the path is on the ignore list.
    pub async fn observe_request(&self, scope: &ScopeHandle, req: RequestObservation) {
        if self.is_ignored(&req.path) {
            tracing::trace!(path = %req.path, "ignored route, not observed");
            return;
        }

        let identity = scope.identity();
        let mut message = match self.base_message(VIEWS, identity.as_deref()) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "could not build view measurement");
                return;
            }
        };

        let classification = classify(req.status);
        message
            .merge_tags(classification.tags)
            .merge_fields(classification.fields)
            .tag("view", req.path)
            .tag("method", req.method)
            .field("response_time", req.elapsed.as_secs_f64());

        self.dispatch(scope, message).await;
    }
}

// ─── Builder ─────────────────────────────────────────────────────

pub struct ObservabilityBuilder {
    config: ObservabilityConfig,
    clock: Option<Arc<dyn Clock>>,
    connector: Option<Arc<dyn SinkConnector>>,
    capture: Option<Arc<CaptureStore>>,
}

impl ObservabilityBuilder {
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Replace the InfluxDB connector (tests, alternative transports).
    pub fn connector(mut self, connector: impl SinkConnector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub fn capture(mut self, capture: Arc<CaptureStore>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn build(self) -> Observability {
        let ObservabilityConfig {
            influxdb,
            hostname,
            ignored_routes,
            testing,
        } = self.config;

        let connector: Arc<dyn SinkConnector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(InfluxDbConnector::new(influxdb)),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };

        Observability {
            inner: Arc::new(Inner {
                hostname: hostname.unwrap_or_else(machine_hostname),
                ignored_routes,
                testing: AtomicBool::new(testing),
                capture: self.capture.unwrap_or_default(),
                connector,
                clock,
            }),
        }
    }
}

fn machine_hostname() -> String {
    let name = gethostname::gethostname().to_string_lossy().trim().to_owned();
    if name.is_empty() {
        "localhost".into()
    } else {
        name
    }
}
