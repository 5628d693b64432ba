use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Upper bin edges in seconds; the last bin is open-ended.
pub const BIN_EDGES: [f64; 6] = [10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Bin labels, one more than [`BIN_EDGES`].
pub const BIN_LABELS: [&str; 7] = [
    "<10s", "10-30s", "30-60s", "1-2min", "2-5min", "5-10min", ">10min",
];

fn exec_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Cloudy ends:.*?ExecTime(?:\(s\))?\s*(?:=)?\s*([0-9.]+)")
            .expect("exec time pattern compiles")
    })
}

/// Every `Cloudy ends: ... ExecTime(s) = <secs>` duration reported in a document.
pub fn extract_exec_times(text: &str) -> Vec<f64> {
    exec_time_re()
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .collect()
}

/// Wall-clock durations binned into fixed ranges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecTimeHistogram {
    counts: [usize; 7],
    total: f64,
    samples: usize,
}

impl ExecTimeHistogram {
    /// Creates an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a histogram from a sequence of durations.
    pub fn from_times(times: impl IntoIterator<Item = f64>) -> Self {
        let mut histogram = Self::new();
        for seconds in times {
            histogram.record(seconds);
        }
        histogram
    }

    /// Adds one duration in seconds.
    pub fn record(&mut self, seconds: f64) {
        let bin = BIN_EDGES
            .iter()
            .position(|&edge| seconds < edge)
            .unwrap_or(BIN_EDGES.len());
        self.counts[bin] += 1;
        self.total += seconds;
        self.samples += 1;
    }

    /// `(label, count)` for every bin in order.
    pub fn bins(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        BIN_LABELS.iter().copied().zip(self.counts.iter().copied())
    }

    /// Number of recorded durations.
    pub fn len(&self) -> usize {
        self.samples
    }

    /// Returns true when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Arithmetic mean, if any duration was recorded.
    pub fn mean(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.total / self.samples as f64)
    }
}
