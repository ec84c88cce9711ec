//! Config loader (strict YAML parsing, per-field defaults).

pub mod schema;

use std::fs;

use crate::error::{ObservabilityError, Result};

pub use schema::{InfluxDbConfig, ObservabilityConfig};

pub fn load_from_file(path: &str) -> Result<ObservabilityConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ObservabilityError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ObservabilityConfig> {
    serde_yaml::from_str(s).map_err(|e| ObservabilityError::Config(format!("invalid yaml: {e}")))
}
