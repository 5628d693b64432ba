use std::collections::BTreeMap;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boilerplate lines that carry no diagnostic content.
pub const IGNORED_PHRASES: [&str; 2] = ["Cautions are present", "Warnings are present"];

/// Message used when only the run-summary warned flags are available.
pub const FLAG_RECORD: &str = "<grid warning flag>";

fn warning_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(?:WARNING|CAUTION|PROBLEM|BOTCHED)\b.*")
            .expect("warning pattern compiles")
    })
}

fn block_delimiter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#\s*Special\.\s*$").expect("delimiter pattern compiles"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern compiles"))
}

/// Collapses whitespace runs to one space and trims.
pub fn normalize_message(raw: &str) -> String {
    whitespace_re().replace_all(raw.trim(), " ").into_owned()
}

fn is_ignored(message: &str) -> bool {
    let lower = message.to_lowercase();
    IGNORED_PHRASES
        .iter()
        .any(|phrase| lower.contains(&phrase.to_lowercase()))
}

/// Normalized, non-boilerplate severity lines of a document, deduplicated in order.
pub fn scan_messages(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for found in warning_line_re().find_iter(text) {
        let message = normalize_message(found.as_str());
        if is_ignored(&message) || out.contains(&message) {
            continue;
        }
        out.push(message);
    }
    out
}

/// Splits a combined summary into per-point blocks, dropping an empty leading block.
pub fn split_blocks(text: &str) -> Vec<&str> {
    let mut blocks: Vec<&str> = block_delimiter_re().split(text).collect();
    if blocks.first().is_some_and(|first| first.trim().is_empty()) {
        blocks.remove(0);
    }
    blocks
}

/// Min/max of one axis over the points that raised a message.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisRange {
    /// Smallest value seen, if any.
    pub min: Option<f64>,
    /// Largest value seen, if any.
    pub max: Option<f64>,
}

impl AxisRange {
    /// Widens the range to include `value`.
    pub fn include(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    /// `min-max` with three decimals, or `unknown` when empty.
    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{min:.3}-{max:.3}"),
            _ => "unknown".to_string(),
        }
    }
}

/// Aggregated statistics for one distinct normalized message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    /// Normalized message text.
    pub message: String,
    /// Number of points that raised the message.
    pub count: usize,
    /// `log n_H` range of those points.
    pub density: AxisRange,
    /// `log T` range of those points.
    pub temperature: AxisRange,
}

impl WarningRecord {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            count: 0,
            density: AxisRange::default(),
            temperature: AxisRange::default(),
        }
    }

    fn fold(&mut self, coordinates: Option<(f64, f64)>) {
        self.count += 1;
        if let Some((density, temperature)) = coordinates {
            self.density.include(density);
            self.temperature.include(temperature);
        }
    }
}

/// Collects per-point warning messages from logs and summaries.
///
/// Messages from documents that cannot be tied to one grid index are credited
/// to every warned point, or to an unattributed bucket when none is warned.
/// This attribution is an approximation.
#[derive(Debug, Clone, Default)]
pub struct WarningAggregator {
    warned: Vec<usize>,
    points: Vec<usize>,
    messages: IndexMap<Option<usize>, Vec<String>>,
}

impl WarningAggregator {
    /// Creates an aggregator for the warned indices and all grid indices.
    pub fn new(warned: &[usize], points: &[usize]) -> Self {
        let mut unique_warned = Vec::new();
        for &idx in warned {
            if !unique_warned.contains(&idx) {
                unique_warned.push(idx);
            }
        }
        let mut points = points.to_vec();
        points.sort_unstable();
        Self {
            warned: unique_warned,
            points,
            messages: IndexMap::new(),
        }
    }

    fn is_tracked(&self, index: usize) -> bool {
        self.warned.is_empty() || self.warned.contains(&index)
    }

    fn unattributed_targets(&self) -> Vec<Option<usize>> {
        if self.warned.is_empty() {
            vec![None]
        } else {
            self.warned.iter().copied().map(Some).collect()
        }
    }

    fn push(&mut self, key: Option<usize>, message: &str) {
        let bucket = self.messages.entry(key).or_default();
        if !bucket.iter().any(|existing| existing == message) {
            bucket.push(message.to_string());
        }
    }

    fn push_all(&mut self, targets: &[Option<usize>], messages: &[String]) {
        for message in messages {
            for &target in targets {
                self.push(target, message);
            }
        }
    }

    /// Adds a simulation output document, attributed to `index` when its name carries one.
    pub fn add_output(&mut self, index: Option<usize>, text: &str) {
        let messages = scan_messages(text);
        if messages.is_empty() {
            return;
        }
        let targets = match index {
            Some(idx) => vec![Some(idx)],
            None => self.unattributed_targets(),
        };
        self.push_all(&targets, &messages);
    }

    /// Adds a per-point summary document; ignored for unwarned points when any point is warned.
    pub fn add_point_summary(&mut self, index: usize, text: &str) {
        if !self.is_tracked(index) {
            return;
        }
        let messages = scan_messages(text);
        self.push_all(&[Some(index)], &messages);
    }

    /// Adds the combined multi-point summary.
    ///
    /// Blocks are matched 1:1 to points sorted by index. With fewer blocks
    /// than points, the whole document is credited to every warned point.
    pub fn add_combined_summary(&mut self, text: &str) {
        let blocks = split_blocks(text);
        if !blocks.is_empty() && blocks.len() >= self.points.len() {
            let pairs: Vec<(usize, &str)> = self.points.iter().copied().zip(blocks).collect();
            for (index, block) in pairs {
                if !self.is_tracked(index) {
                    continue;
                }
                let messages = scan_messages(block);
                self.push_all(&[Some(index)], &messages);
            }
            return;
        }
        debug!(
            blocks = blocks.len(),
            points = self.points.len(),
            "summary blocks do not cover every point, attributing whole document"
        );
        let messages = scan_messages(text);
        let targets = self.unattributed_targets();
        self.push_all(&targets, &messages);
    }

    /// Deduplicated messages per point in insertion order; `None` is the unattributed bucket.
    pub fn messages(&self) -> &IndexMap<Option<usize>, Vec<String>> {
        &self.messages
    }

    /// Folds per-point messages into records, in first-seen order.
    ///
    /// `coordinates` maps grid indices to `(log n_H, log T)`. Without any log
    /// message, warned points collapse into a single [`FLAG_RECORD`].
    pub fn records(&self, coordinates: &BTreeMap<usize, (f64, f64)>) -> Vec<WarningRecord> {
        let mut summary: IndexMap<&str, WarningRecord> = IndexMap::new();
        for (key, messages) in &self.messages {
            let coords = key.and_then(|idx| coordinates.get(&idx).copied());
            for message in messages {
                summary
                    .entry(message.as_str())
                    .or_insert_with(|| WarningRecord::new(message.as_str()))
                    .fold(coords);
            }
        }
        if summary.is_empty() && !self.warned.is_empty() {
            let mut record = WarningRecord::new(FLAG_RECORD);
            for idx in &self.warned {
                record.fold(coordinates.get(idx).copied());
            }
            return vec![record];
        }
        summary.into_values().collect()
    }
}
