use std::collections::HashMap;

use serde::Deserialize;

/// Options are validated by type only; no cross-field checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub influxdb: InfluxDbConfig,

    /// Overrides the machine hostname in the `host` tag.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Requests whose raw path contains any of these substrings are not observed.
    #[serde(default = "default_ignored_routes")]
    pub ignored_routes: Vec<String>,

    /// Capture mode: route measurements to the in-memory store.
    #[serde(default)]
    pub testing: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            influxdb: InfluxDbConfig::default(),
            hostname: None,
            ignored_routes: default_ignored_routes(),
            testing: false,
        }
    }
}

impl ObservabilityConfig {
    /// Default config with capture mode on.
    pub fn testing() -> Self {
        Self {
            testing: true,
            ..Self::default()
        }
    }
}

fn default_ignored_routes() -> Vec<String> {
    vec!["/static".into()]
}

// ─── Sink connectivity ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfluxDbConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub ssl: bool,

    #[serde(default)]
    pub verify_ssl: bool,

    /// Seconds; `None` waits indefinitely.
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Transport-level attempts on connection errors.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default)]
    pub use_udp: bool,

    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// Scheme → proxy URL, e.g. `{"http": "http://proxy:3128"}`.
    #[serde(default)]
    pub proxies: Option<HashMap<String, String>>,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// URL prefix in front of `/write`.
    #[serde(default)]
    pub path: String,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: default_password(),
            database: None,
            ssl: false,
            verify_ssl: false,
            timeout: None,
            retries: default_retries(),
            use_udp: false,
            udp_port: default_udp_port(),
            proxies: None,
            pool_size: default_pool_size(),
            path: String::new(),
        }
    }
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    8086
}
fn default_user() -> String {
    "root".into()
}
fn default_password() -> String {
    "root".into()
}
fn default_retries() -> u32 {
    3
}
fn default_udp_port() -> u16 {
    4444
}
fn default_pool_size() -> usize {
    10
}
