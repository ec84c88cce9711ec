//! End-to-end tests: the demo router driven in-process with `oneshot`.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tower::ServiceExt;

use axum_observability::config::{InfluxDbConfig, ObservabilityConfig};
use axum_observability::measurement::FixedClock;
use axum_observability::server::{self, AppState, USER_HEADER};
use axum_observability::sink::{Sink, SinkConnector};
use axum_observability::{FieldValue, Measurement, Observability, ObservabilityError, VIEWS};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn config(testing: bool) -> ObservabilityConfig {
    ObservabilityConfig {
        hostname: Some("somehost".into()),
        testing,
        // Nothing listens here; live writes fail fast.
        influxdb: InfluxDbConfig {
            host: "127.0.0.1".into(),
            port: 1,
            retries: 1,
            timeout: Some(1.0),
            ..InfluxDbConfig::default()
        },
        ..ObservabilityConfig::default()
    }
}

fn frozen() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2012, 8, 26, 0, 0, 0).unwrap())
}

fn capture_obs() -> Observability {
    Observability::builder(config(true)).clock(frozen()).build()
}

fn app(obs: &Observability) -> Router {
    server::create_router(Arc::new(AppState { obs: obs.clone() }))
}

async fn call(app: Router, method: &str, uri: &str) -> StatusCode {
    call_as(app, method, uri, None).await
}

async fn call_as(app: Router, method: &str, uri: &str, user: Option<&str>) -> StatusCode {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header(USER_HEADER, user);
    }
    let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    res.status()
}

/// Records every written point; counts connections.
#[derive(Clone, Default)]
struct RecordingConnector {
    connects: Arc<AtomicUsize>,
    points: Arc<Mutex<Vec<Measurement>>>,
}

struct RecordingSink(Arc<Mutex<Vec<Measurement>>>);

#[async_trait]
impl Sink for RecordingSink {
    async fn write_points(&self, points: &[Measurement]) -> axum_observability::Result<()> {
        self.0.lock().extend_from_slice(points);
        Ok(())
    }
}

impl SinkConnector for RecordingConnector {
    fn connect(&self) -> axum_observability::Result<Arc<dyn Sink>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingSink(self.points.clone())))
    }
}

struct DownConnector;

struct DownSink;

#[async_trait]
impl Sink for DownSink {
    async fn write_points(&self, _points: &[Measurement]) -> axum_observability::Result<()> {
        Err(ObservabilityError::SinkUnavailable("connection refused".into()))
    }
}

impl SinkConnector for DownConnector {
    fn connect(&self) -> axum_observability::Result<Arc<dyn Sink>> {
        Ok(Arc::new(DownSink))
    }
}

struct UnconnectableConnector;

impl SinkConnector for UnconnectableConnector {
    fn connect(&self) -> axum_observability::Result<Arc<dyn Sink>> {
        Err(ObservabilityError::SinkUnavailable("no route to host".into()))
    }
}

// ============================================================================
// Automatic per-request observation
// ============================================================================

#[tokio::test]
async fn successful_view_is_captured_exactly() {
    let obs = capture_obs();
    assert_eq!(call(app(&obs), "GET", "/login?username=admin").await, StatusCode::OK);

    let views = obs.capture().get(VIEWS);
    assert_eq!(views.len(), 1);

    let observation = views[0].to_json();
    assert_eq!(
        observation,
        json!({
            "fields": {
                "2xx": 1,
                "http_response_code": 200,
                "response_time": observation["fields"]["response_time"],
                "success": 1,
            },
            "measurement": "views",
            "tags": {
                "host": "somehost",
                "method": "GET",
                "result": "success",
                "status_code": "200",
                "view": "/login",
            },
            "time": "2012-08-26T00:00:00+00:00",
        })
    );
    assert!(views[0].fields["response_time"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn forbidden_view_is_a_client_error() {
    let obs = capture_obs();
    assert_eq!(call(app(&obs), "GET", "/login?username=bad").await, StatusCode::FORBIDDEN);

    let views = obs.capture().get(VIEWS);
    assert_eq!(views.len(), 1);
    let fields = &views[0].fields;
    assert_eq!(fields["4xx"], FieldValue::Integer(1));
    assert_eq!(fields["error"], FieldValue::Integer(1));
    assert_eq!(fields["http_response_code"], FieldValue::Integer(403));
    assert!(!fields.contains_key("success"));
    assert_eq!(views[0].tags["result"], "client_error");
}

#[tokio::test]
async fn server_errors_are_bucketed() {
    let obs = capture_obs();
    assert_eq!(
        call(app(&obs), "GET", "/error?errorcode=501").await,
        StatusCode::NOT_IMPLEMENTED
    );

    let views = obs.capture().get(VIEWS);
    assert!(!views.is_empty());
    assert_eq!(views[0].fields["5xx"], FieldValue::Integer(1));
    assert_eq!(views[0].fields["error"], FieldValue::Integer(1));
    assert_eq!(views[0].fields["http_response_code"], FieldValue::Integer(501));
}

#[tokio::test]
async fn ignored_routes_produce_nothing() {
    let obs = capture_obs();
    assert_eq!(call(app(&obs), "GET", "/static").await, StatusCode::NOT_FOUND);
    assert_eq!(call(app(&obs), "GET", "/static/app.css").await, StatusCode::NOT_FOUND);
    assert!(obs.capture().get(VIEWS).is_empty());
    assert!(obs.capture().is_empty());
}

#[tokio::test]
async fn unknown_route_is_still_observed() {
    let obs = capture_obs();
    assert_eq!(call(app(&obs), "GET", "/nope").await, StatusCode::NOT_FOUND);
    assert_eq!(obs.capture().get(VIEWS)[0].tags["view"], "/nope");
}

#[tokio::test]
async fn authenticated_caller_adds_user_tag() {
    let obs = capture_obs();
    let status = call_as(app(&obs), "GET", "/login", Some("alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(obs.capture().get(VIEWS)[0].tags["user"], "alice");
}

#[tokio::test]
async fn views_are_recorded_in_call_order() {
    let obs = capture_obs();
    for code in [200u16, 404, 500, 302] {
        let uri = if code == 200 { "/error".to_string() } else { format!("/error?errorcode={code}") };
        call(app(&obs), "GET", &uri).await;
    }

    let codes: Vec<i64> = obs
        .capture()
        .get(VIEWS)
        .iter()
        .map(|m| m.fields["http_response_code"].as_i64().unwrap())
        .collect();
    assert_eq!(codes, vec![200, 404, 500, 302]);
}

// ============================================================================
// Manual emission
// ============================================================================

#[tokio::test]
async fn metrics_can_be_sent_manually() {
    let obs = capture_obs();
    obs.send("heartbeat", [("trigger", "manual")], [("alive", true)])
        .await
        .unwrap();

    let beats = obs.capture().get("heartbeat");
    assert_eq!(beats.len(), 1);
    assert_eq!(beats[0].fields["alive"], FieldValue::Boolean(true));
    assert_eq!(beats[0].tags["trigger"], "manual");
    assert_eq!(beats[0].tags["host"], "somehost");
}

#[tokio::test]
async fn send_without_fields_raises_invalid_argument() {
    let obs = capture_obs();
    let no_fields = Vec::<(String, FieldValue)>::new();

    let err = obs
        .send("heartbeat", [("trigger", "manual")], no_fields.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ObservabilityError::InvalidArgument(_)));

    let err = obs
        .send("heartbeat", Vec::<(String, String)>::new(), no_fields)
        .await
        .unwrap_err();
    assert!(matches!(err, ObservabilityError::InvalidArgument(_)));
    assert!(obs.capture().get("heartbeat").is_empty());
}

#[tokio::test]
async fn heartbeat_endpoint_sends_through_the_pipeline() {
    let obs = capture_obs();
    assert_eq!(call(app(&obs), "POST", "/heartbeat").await, StatusCode::NO_CONTENT);

    assert_eq!(obs.capture().count("heartbeat"), 1);
    assert_eq!(obs.capture().count(VIEWS), 1);
}

#[tokio::test]
async fn ambient_send_inherits_request_caller() {
    let obs = capture_obs();
    let status = call_as(app(&obs), "POST", "/jobs/reindex", Some("bob")).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let jobs = obs.capture().get("jobs");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].tags["job"], "reindex");
    assert_eq!(jobs[0].tags["user"], "bob");
}

// ============================================================================
// Per-call observation
// ============================================================================

#[tokio::test]
async fn observed_handler_records_success_and_failure() {
    let obs = capture_obs();
    assert_eq!(call(app(&obs), "GET", "/checkout/10").await, StatusCode::CREATED);
    assert_eq!(
        call(app(&obs), "GET", "/checkout/5000").await,
        StatusCode::PAYMENT_REQUIRED
    );

    let calls = obs.capture().get("checkout");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].fields["success"], FieldValue::Integer(1));
    assert_eq!(calls[0].tags["code"], "201");
    assert_eq!(calls[1].fields["failure"], FieldValue::Integer(1));
    assert_eq!(calls[1].tags["code"], "402");

    // The original error still reached the client and the view hook.
    let views = obs.capture().get(VIEWS);
    assert_eq!(views[1].fields["http_response_code"], FieldValue::Integer(402));
}

// ============================================================================
// Live mode
// ============================================================================

#[tokio::test]
async fn live_mode_writes_once_per_measurement_and_connects_once_per_request() {
    let connector = RecordingConnector::default();
    let obs = Observability::builder(config(false))
        .clock(frozen())
        .connector(connector.clone())
        .build();

    assert_eq!(call(app(&obs), "POST", "/jobs/a").await, StatusCode::ACCEPTED);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

    assert_eq!(call(app(&obs), "GET", "/login").await, StatusCode::OK);
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);

    let names: Vec<String> = connector.points.lock().iter().map(|m| m.name.clone()).collect();
    assert_eq!(names, vec!["jobs", "views", "views"]);
    assert!(obs.capture().is_empty());
}

#[tokio::test]
async fn failing_sink_never_breaks_the_request() {
    let obs = Observability::builder(config(false))
        .connector(DownConnector)
        .build();
    assert_eq!(call(app(&obs), "GET", "/login").await, StatusCode::OK);
    assert_eq!(call(app(&obs), "GET", "/login?username=bad").await, StatusCode::FORBIDDEN);
    assert!(obs.capture().is_empty());

    obs.send("heartbeat", [("trigger", "manual")], [("alive", true)])
        .await
        .unwrap();
}

#[tokio::test]
async fn unconnectable_sink_never_breaks_the_request() {
    let obs = Observability::builder(config(false))
        .connector(UnconnectableConnector)
        .build();
    assert_eq!(call(app(&obs), "POST", "/heartbeat").await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn real_client_against_closed_port_is_swallowed() {
    let obs = capture_obs();
    obs.set_testing(false);
    obs.send("heartbeat", [("trigger", "manual")], [("alive", true)])
        .await
        .unwrap();
    assert!(obs.capture().is_empty());
}

#[tokio::test]
async fn oversized_sink_timeout_never_breaks_the_request() {
    let yaml = r#"
hostname: somehost
testing: false
influxdb: { host: 127.0.0.1, port: 1, timeout: 1.0e30 }
"#;
    let obs = Observability::new(axum_observability::config::load_from_str(yaml).unwrap());
    assert_eq!(call(app(&obs), "GET", "/login").await, StatusCode::OK);
    assert!(obs.capture().is_empty());
}

#[tokio::test]
async fn capture_mode_never_touches_the_sink() {
    let connector = RecordingConnector::default();
    let obs = Observability::builder(config(true))
        .connector(connector.clone())
        .build();

    call(app(&obs), "POST", "/jobs/a").await;
    call(app(&obs), "GET", "/login").await;

    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    assert!(connector.points.lock().is_empty());
    assert_eq!(obs.capture().count(VIEWS), 2);
}

// ============================================================================
// Capture inspection
// ============================================================================

#[tokio::test]
async fn inspection_endpoint_lists_series() {
    let obs = capture_obs();
    call(app(&obs), "GET", "/login").await;

    let res = app(&obs)
        .oneshot(Request::builder().uri("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(res.into_body(), 1 << 20).await.unwrap();
    let snapshot: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(snapshot["series"][0]["name"], "views");
    assert_eq!(snapshot["series"][0]["count"], 1);
}
