use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use cooltab_core::errors::GridError;
use cooltab_core::provenance::TableProvenance;
use serde::{Deserialize, Serialize};

use crate::serde::to_canonical_json_bytes;
use crate::status::PointRef;
use crate::timing::ExecTimeHistogram;
use crate::warnings::WarningRecord;
use crate::writer::write_atomic;

/// Default number of entries shown per category on the console.
pub const DEFAULT_CONSOLE_LIMIT: usize = 10;

/// Aggregated diagnostics for one processed batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Execution-time histogram.
    pub histogram: ExecTimeHistogram,
    /// Aggregated warning records in first-seen order.
    pub warnings: Vec<WarningRecord>,
    /// Points flagged as warned.
    pub warned: Vec<PointRef>,
    /// Points that failed or were downgraded.
    pub failed: Vec<PointRef>,
    /// Number of points written to the tables.
    pub included: usize,
    /// Provenance of the run summary.
    pub provenance: TableProvenance,
}

fn point_line(point: &PointRef) -> String {
    format!(
        "grid index {}: log n_H={:.3}, log T={:.3}, log={}",
        point.index, point.density, point.temperature, point.artifact
    )
}

fn warning_line(record: &WarningRecord) -> String {
    format!(
        "{} x {} (log n_H {}, log T {})",
        record.count,
        record.message,
        record.density.describe(),
        record.temperature.describe()
    )
}

fn push_capped(out: &mut String, points: &[PointRef], limit: usize) {
    for point in points.iter().take(limit) {
        let _ = writeln!(out, " - {}", point_line(point));
    }
    if points.len() > limit {
        let _ = writeln!(out, "   ... {} more", points.len() - limit);
    }
}

impl StatisticsReport {
    /// Renders the statistics document.
    pub fn render_text(&self) -> String {
        let mut out = String::from("# Execution time histogram\n");
        match self.histogram.mean() {
            Some(mean) => {
                for (label, count) in self.histogram.bins() {
                    let _ = writeln!(out, "{label}: {count}");
                }
                let _ = writeln!(out, "Average ExecTime: {mean:.2} s");
            }
            None => out.push_str("No ExecTime data found.\n"),
        }

        out.push_str("\n# Warnings (from logs)\n");
        if self.warnings.is_empty() {
            out.push_str("None\n");
        }
        for record in &self.warnings {
            let _ = writeln!(out, "{}", warning_line(record));
        }

        out.push_str("\n# Grid warnings\n");
        self.push_points(&mut out, &self.warned, "total warnings");
        out.push_str("\n# Failed runs\n");
        self.push_points(&mut out, &self.failed, "total failures");
        out
    }

    fn push_points(&self, out: &mut String, points: &[PointRef], total_label: &str) {
        if points.is_empty() {
            out.push_str("None\n");
            return;
        }
        for point in points {
            let _ = writeln!(out, "{}", point_line(point));
        }
        let _ = writeln!(out, "{total_label}: {}", points.len());
    }

    /// Console summary showing at most `limit` points per category.
    pub fn console_summary(&self, limit: usize) -> String {
        let mut out = String::new();
        if self.failed.is_empty() {
            out.push_str("No failed grid points.\n");
        } else {
            let _ = writeln!(
                out,
                "FAILURES: {} grid points did not complete (showing up to {limit}):",
                self.failed.len()
            );
            push_capped(&mut out, &self.failed, limit);
        }

        if self.warned.is_empty() {
            out.push_str("No grid points reported warnings.\n");
            return out;
        }
        let _ = writeln!(
            out,
            "WARNINGS: {} grid points completed with warnings (showing up to {limit}):",
            self.warned.len()
        );
        push_capped(&mut out, &self.warned, limit);
        out.push_str("\nWarning summary:\n");
        for record in &self.warnings {
            let _ = writeln!(out, " - {}", warning_line(record));
        }
        out
    }

    /// Writes `<prefix>_stats.txt` and the `<prefix>_stats.json` sidecar.
    pub fn write(&self, output_dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf), GridError> {
        let text_path = output_dir.join(format!("{prefix}_stats.txt"));
        let json_path = output_dir.join(format!("{prefix}_stats.json"));
        write_atomic(&text_path, self.render_text().as_bytes())?;
        write_atomic(&json_path, &to_canonical_json_bytes(self)?)?;
        Ok((text_path, json_path))
    }
}
