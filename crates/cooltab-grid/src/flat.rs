use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use cooltab_core::errors::GridError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::writer::write_atomic;

/// Timestamp layout of the flat-table header (`Mon Jan 01 00:00:00 2024`).
pub const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Density grouping resolution: values are rounded to six decimals.
const GROUP_SCALE: f64 = 1e6;

/// `%.{precision}e` with a signed exponent of at least two digits.
pub fn format_exp(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return format_non_finite(value);
    }
    let raw = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    match exponent.parse::<i32>() {
        Ok(exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        Err(_) => raw,
    }
}

/// `%.{precision}f` with lowercase `nan`/`inf`.
pub fn format_fixed(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        format_non_finite(value)
    }
}

fn format_non_finite(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

/// One output row of a flat cooling map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    /// `log n_H` of the source point.
    pub log_density: f64,
    /// `log T` of the source point.
    pub log_temperature: f64,
    /// Linear temperature `10^logT`.
    pub temperature: f64,
    /// Heating rate divided by `n_H^2`.
    pub heating: f64,
    /// Cooling rate divided by `n_H^2`.
    pub cooling: f64,
    /// Mean molecular weight.
    pub mmw: f64,
}

impl FlatRow {
    /// Scales volumetric rates by `n_H^2` with `n_H = 10^logn`.
    pub fn from_point(log_density: f64, log_temperature: f64, heating: f64, cooling: f64, mmw: f64) -> Self {
        let n_h = 10f64.powf(log_density);
        let scale = n_h * n_h;
        Self {
            log_density,
            log_temperature,
            temperature: 10f64.powf(log_temperature),
            heating: heating / scale,
            cooling: cooling / scale,
            mmw,
        }
    }
}

/// Groups rows by density (six decimals), ascending, each group sorted by temperature.
pub fn group_by_density(rows: &[FlatRow]) -> Vec<Vec<FlatRow>> {
    let mut groups: BTreeMap<i64, Vec<FlatRow>> = BTreeMap::new();
    for row in rows {
        let key = (row.log_density * GROUP_SCALE).round() as i64;
        groups.entry(key).or_default().push(*row);
    }
    groups
        .into_values()
        .map(|mut group| {
            group.sort_by(|a, b| a.log_temperature.total_cmp(&b.log_temperature));
            group
        })
        .collect()
}

/// Renders one flat cooling map; `rows` must be non-empty and temperature-sorted.
pub fn render_flat_table(timestamp: &str, rows: &[FlatRow]) -> String {
    let density = rows.first().map_or(f64::NAN, |row| row.log_density);
    let mut out = String::new();
    let _ = writeln!(out, "# {timestamp}\n#");
    out.push_str("# Cooling Map File\n#\n");
    out.push_str("# Loop values:\n");
    let _ = writeln!(out, "# hden {}\n#", format_fixed(density, 6));
    out.push_str("# Data Columns:\n");
    out.push_str("# Te [K]\n");
    out.push_str("# Heating [erg s^-1 cm^3]\n");
    out.push_str("# Cooling [erg s^-1 cm^3]\n");
    out.push_str("# Mean Molecular Weight [amu]\n#\n");
    out.push_str("#Te\t\tHeating\t\tCooling\t\tMMW\n");
    for row in rows {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            format_exp(row.temperature, 6),
            format_exp(row.heating, 7),
            format_exp(row.cooling, 7),
            format_fixed(row.mmw, 6)
        );
    }
    out
}

/// Writes `<prefix>_run<N>.dat` per density group, `N` from 1 in ascending density.
#[derive(Debug, Clone)]
pub struct FlatTableWriter {
    output_dir: PathBuf,
    prefix: String,
    timestamp: String,
}

impl FlatTableWriter {
    /// Creates a writer stamping every file with `timestamp`.
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Path of the file for 1-based run `run`.
    pub fn run_path(&self, run: usize) -> PathBuf {
        self.output_dir.join(format!("{}_run{run}.dat", self.prefix))
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Groups, renders and persists every run file; returns the written paths.
    pub fn write(&self, rows: &[FlatRow]) -> Result<Vec<PathBuf>, GridError> {
        let mut written = Vec::new();
        for (offset, group) in group_by_density(rows).iter().enumerate() {
            let path = self.run_path(offset + 1);
            write_atomic(&path, render_flat_table(&self.timestamp, group).as_bytes())?;
            written.push(path);
        }
        info!(files = written.len(), dir = %self.output_dir.display(), "wrote flat cooling maps");
        Ok(written)
    }
}
