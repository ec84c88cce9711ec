//! Capture mode: measurements land in memory instead of the live sink.

pub mod percentiles;
pub mod store;
pub mod stream;

pub use percentiles::PercentileSet;
pub use store::{CaptureSnapshot, CaptureStore, SeriesSummary};
