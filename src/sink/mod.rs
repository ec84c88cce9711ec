//! Live sink abstraction.
//!
//! Connections are opened through a [`SinkConnector`] and cached per request
//! in [`crate::scope::Scope`]. Capture mode never calls into this module.

pub mod influxdb;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::measurement::Measurement;

pub use influxdb::{InfluxDbClient, InfluxDbConnector};

/// One logical connection to the time-series store.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Single best-effort write of a batch of points.
    async fn write_points(&self, points: &[Measurement]) -> Result<()>;
}

/// Builds connections from a fixed configuration.
pub trait SinkConnector: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn Sink>>;
}
