//! InfluxDB 1.x client: line protocol over HTTP `/write` or UDP.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, UdpSocket};

use super::{Sink, SinkConnector};
use crate::config::InfluxDbConfig;
use crate::error::{ObservabilityError, Result};
use crate::measurement::{FieldValue, Measurement};

// ─── Connector ───────────────────────────────────────────────────

/// Builds one [`InfluxDbClient`] per request scope from a fixed config.
pub struct InfluxDbConnector {
    config: InfluxDbConfig,
}

impl InfluxDbConnector {
    pub fn new(config: InfluxDbConfig) -> Self {
        Self { config }
    }
}

impl SinkConnector for InfluxDbConnector {
    fn connect(&self) -> Result<Arc<dyn Sink>> {
        Ok(Arc::new(InfluxDbClient::from_config(&self.config)?))
    }
}

// ─── Client ──────────────────────────────────────────────────────

pub struct InfluxDbClient {
    transport: Transport,
}

enum Transport {
    Http {
        client: reqwest::Client,
        write_url: String,
        database: Option<String>,
        user: String,
        password: String,
        attempts: u32,
    },
    Udp {
        host: String,
        port: u16,
    },
}

impl InfluxDbClient {
    pub fn from_config(cfg: &InfluxDbConfig) -> Result<Self> {
        if cfg.use_udp {
            return Ok(Self {
                transport: Transport::Udp {
                    host: cfg.host.clone(),
                    port: cfg.udp_port,
                },
            });
        }

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(cfg.pool_size)
            .danger_accept_invalid_certs(cfg.ssl && !cfg.verify_ssl);

        if let Some(secs) = cfg.timeout {
            let timeout = Duration::try_from_secs_f64(secs)
                .map_err(|e| ObservabilityError::Config(format!("influxdb timeout {secs}: {e}")))?;
            builder = builder.timeout(timeout);
        }

        for (scheme, url) in cfg.proxies.iter().flatten() {
            let proxy = match scheme.as_str() {
                "http" => reqwest::Proxy::http(url),
                "https" => reqwest::Proxy::https(url),
                _ => reqwest::Proxy::all(url),
            }
            .map_err(|e| ObservabilityError::Config(format!("proxy {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ObservabilityError::SinkUnavailable(format!("client build: {e}")))?;

        Ok(Self {
            transport: Transport::Http {
                client,
                write_url: write_url(cfg),
                database: cfg.database.clone(),
                user: cfg.user.clone(),
                password: cfg.password.clone(),
                attempts: cfg.retries.max(1),
            },
        })
    }

    async fn write_http(
        client: &reqwest::Client,
        url: &str,
        database: Option<&str>,
        user: &str,
        password: &str,
        attempts: u32,
        body: String,
    ) -> Result<()> {
        let mut query: Vec<(&str, &str)> = vec![("u", user), ("p", password)];
        if let Some(db) = database {
            query.push(("db", db));
        }

        let mut last_err = None;
        for attempt in 1..=attempts {
            let sent = client
                .post(url)
                .query(&query)
                .header("Content-Type", "application/octet-stream")
                .body(body.clone())
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status();
                    let detail = resp.text().await.unwrap_or_default();
                    return Err(ObservabilityError::SinkUnavailable(format!(
                        "influxdb responded {status}: {detail}"
                    )));
                }
                // Only transport failures are worth another attempt.
                Err(e) if e.is_connect() || e.is_timeout() => {
                    tracing::debug!(attempt, error = %e, "influxdb write attempt failed");
                    last_err = Some(e);
                }
                Err(e) => return Err(ObservabilityError::SinkUnavailable(e.to_string())),
            }
        }

        Err(ObservabilityError::SinkUnavailable(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    async fn write_udp(host: &str, port: u16, body: String) -> Result<()> {
        let target = lookup_host((host, port))
            .await
            .map_err(|e| ObservabilityError::SinkUnavailable(format!("resolve {host}: {e}")))?
            .next()
            .ok_or_else(|| ObservabilityError::SinkUnavailable(format!("{host} has no address")))?;

        // The local socket must match the target's address family.
        let local = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| ObservabilityError::SinkUnavailable(e.to_string()))?;
        socket
            .send_to(body.as_bytes(), target)
            .await
            .map_err(|e| ObservabilityError::SinkUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Sink for InfluxDbClient {
    async fn write_points(&self, points: &[Measurement]) -> Result<()> {
        let body = points
            .iter()
            .map(to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        match &self.transport {
            Transport::Http {
                client,
                write_url,
                database,
                user,
                password,
                attempts,
            } => {
                Self::write_http(
                    client,
                    write_url,
                    database.as_deref(),
                    user,
                    password,
                    *attempts,
                    body,
                )
                .await
            }
            Transport::Udp { host, port } => Self::write_udp(host, *port, body).await,
        }
    }
}

fn write_url(cfg: &InfluxDbConfig) -> String {
    let scheme = if cfg.ssl { "https" } else { "http" };
    let path = cfg.path.trim_matches('/');
    if path.is_empty() {
        format!("{scheme}://{}:{}/write", cfg.host, cfg.port)
    } else {
        format!("{scheme}://{}:{}/{path}/write", cfg.host, cfg.port)
    }
}

// ─── Line protocol ───────────────────────────────────────────────

/// `name,tag=v field=1i,other=0.5 <ns>`; tags with empty values are dropped.
pub fn to_line_protocol(m: &Measurement) -> String {
    let mut line = escape(&m.name, &[',', ' ']);

    for (k, v) in m.tags.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(line, ",{}={}", escape_key(k), escape_key(v));
    }

    let fields = m
        .fields
        .iter()
        .map(|(k, v)| {
            let value = match v {
                FieldValue::Integer(i) => format!("{i}i"),
                FieldValue::Float(f) => f.to_string(),
                FieldValue::Boolean(b) => b.to_string(),
            };
            format!("{}={value}", escape_key(k))
        })
        .collect::<Vec<_>>()
        .join(",");
    let _ = write!(line, " {fields}");

    if let Some(ns) = m.time.timestamp_nanos_opt() {
        let _ = write!(line, " {ns}");
    }
    line
}

fn escape_key(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
