use std::collections::HashMap;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;

use super::percentiles::PercentileSet;
use crate::measurement::Measurement;

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe capture store.
/// The dispatcher calls `record()`, tests and the inspection endpoints read.
///
/// Append-only: the core never prunes it; harnesses call `clear()` between
/// runs.
#[derive(Default)]
pub struct CaptureStore {
    inner: Mutex<HashMap<String, Vec<Measurement>>>,
}

/// Per-series overview for the inspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub name: String,
    pub count: u64,
    /// Percentiles of `fields.response_time`, in microseconds.
    pub response_time_us: PercentileSet,
    pub last: Option<Measurement>,
}

/// Complete snapshot shipped on every SSE tick.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureSnapshot {
    pub total: u64,
    pub series: Vec<SeriesSummary>,
}

// ─── CaptureStore impl ───────────────────────────────────────────

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one measurement under its name. Atomic per call.
    pub fn record(&self, measurement: Measurement) {
        self.inner
            .lock()
            .entry(measurement.name.clone())
            .or_default()
            .push(measurement);
    }

    /// Measurements emitted under `name`, in emission order.
    pub fn get(&self, name: &str) -> Vec<Measurement> {
        self.inner.lock().get(name).cloned().unwrap_or_default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.inner.lock().get(name).map_or(0, Vec::len)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().values().all(Vec::is_empty)
    }

    /// Wipe all data; test harnesses call this between cases.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Produce a read-only summary for the inspection endpoints.
    pub fn snapshot(&self) -> CaptureSnapshot {
        let inner = self.inner.lock();

        let mut series: Vec<SeriesSummary> = inner
            .iter()
            .map(|(name, items)| SeriesSummary {
                name: name.clone(),
                count: items.len() as u64,
                response_time_us: response_time_percentiles(items),
                last: items.last().cloned(),
            })
            .collect();
        series.sort_by(|a, b| a.name.cmp(&b.name));

        CaptureSnapshot {
            total: series.iter().map(|s| s.count).sum(),
            series,
        }
    }
}

fn response_time_percentiles(items: &[Measurement]) -> PercentileSet {
    let Ok(mut hist) = Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG) else {
        return PercentileSet::empty();
    };

    for m in items {
        let Some(secs) = m.fields.get("response_time").and_then(|v| v.as_f64()) else {
            continue;
        };
        // Clamp to ≥ 1 μs
        let us = ((secs * 1_000_000.0) as u64).max(1);
        let _ = hist.record(us);
    }

    PercentileSet::from_histogram(&hist)
}
