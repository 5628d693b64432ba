use std::fs;
use std::path::{Path, PathBuf};

use cooltab_core::errors::{ErrorInfo, GridError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::locate::PointFileLocator;

/// First run-summary column holding a grid parameter.
pub const PARAM_COLUMN_OFFSET: usize = 6;
/// Rows with fewer tab-separated fields are not grid entries.
pub const MIN_ROW_FIELDS: usize = 7;
/// Token marking a true flag in the run summary.
pub const FLAG_TRUE: &str = "T";

/// Outcome of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointStatus {
    /// Completed without warnings.
    Ok,
    /// Completed with warnings; still included in tables.
    Warned,
    /// Did not complete; excluded from tables.
    Failed,
}

/// One row of the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Grid index as written by the simulation driver.
    pub index: usize,
    /// Raw parameter values in header order.
    pub params: Vec<f64>,
    /// Status recorded by the driver.
    pub status: PointStatus,
}

/// Parsed run-summary document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Parameter column names taken from the `#Index` header.
    pub param_names: Vec<String>,
    /// Grid entries in file order.
    pub points: Vec<GridPoint>,
}

fn malformed(code: &str, message: impl Into<String>, source: &str, line_no: usize) -> GridError {
    GridError::MalformedArtifact(
        ErrorInfo::new(code, message)
            .with_context("source", source)
            .with_context("line", line_no.to_string()),
    )
}

/// Parses a tab-delimited run summary whose header starts with `#Index`.
pub fn parse_run_summary(text: &str, source: &str) -> Result<RunSummary, GridError> {
    let mut summary = RunSummary::default();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#Index") {
            let parts: Vec<&str> = line.trim_start_matches('#').split('\t').collect();
            // The trailing column is the free-form grid parameter string.
            summary.param_names = parts
                .get(PARAM_COLUMN_OFFSET..parts.len().saturating_sub(1))
                .unwrap_or_default()
                .iter()
                .map(|name| name.trim().to_string())
                .collect();
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < MIN_ROW_FIELDS {
            continue;
        }
        let index = parts[0]
            .trim()
            .parse::<usize>()
            .map_err(|err| malformed("run_summary_index", err.to_string(), source, line_no))?;
        let params = (0..summary.param_names.len())
            .map(|j| {
                let raw = parts.get(PARAM_COLUMN_OFFSET + j).ok_or_else(|| {
                    malformed("run_summary_columns", "row is shorter than the header", source, line_no)
                })?;
                raw.trim()
                    .parse::<f64>()
                    .map_err(|err| malformed("run_summary_value", err.to_string(), source, line_no))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let status = if parts[1] == FLAG_TRUE {
            PointStatus::Failed
        } else if parts[2] == FLAG_TRUE {
            PointStatus::Warned
        } else {
            PointStatus::Ok
        };
        summary.points.push(GridPoint {
            index,
            params,
            status,
        });
    }
    if summary.points.is_empty() {
        return Err(GridError::MalformedArtifact(
            ErrorInfo::new("run_summary_empty", "no grid entries found in run summary")
                .with_context("source", source),
        ));
    }
    debug!(points = summary.points.len(), params = summary.param_names.len(), "parsed run summary");
    Ok(summary)
}

/// Reads the run summary; a missing document is fatal.
pub fn load_run_summary(path: &Path) -> Result<RunSummary, GridError> {
    if !path.is_file() {
        return Err(GridError::ArtifactNotFound(
            ErrorInfo::new("run_summary_missing", "run summary document not found")
                .with_path(path)
                .with_hint("run the grid with `save grid` enabled"),
        ));
    }
    let text =
        fs::read_to_string(path).map_err(|err| GridError::io("run_summary_read", path, err))?;
    parse_run_summary(&text, &path.display().to_string())
}

/// Positions of the density and temperature parameters in a point's `params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBinding {
    /// Column whose name contains `hden`.
    pub density: usize,
    /// Column whose name contains `temper` or `const`.
    pub temperature: usize,
}

impl AxisBinding {
    /// Density value (`log n_H`) of a point.
    pub fn density_of(&self, point: &GridPoint) -> f64 {
        point.params[self.density]
    }

    /// Temperature value (`log T`) of a point.
    pub fn temperature_of(&self, point: &GridPoint) -> f64 {
        point.params[self.temperature]
    }
}

/// Binds the density and temperature axes by substring match on column names.
pub fn bind_axes(names: &[String]) -> Result<AxisBinding, GridError> {
    let mut density = None;
    let mut temperature = None;
    for (idx, name) in names.iter().enumerate() {
        let lower = name.to_lowercase();
        if density.is_none() && lower.contains("hden") {
            density = Some(idx);
        }
        if temperature.is_none() && (lower.contains("temper") || lower.contains("const")) {
            temperature = Some(idx);
        }
    }
    match (density, temperature) {
        (Some(density), Some(temperature)) => Ok(AxisBinding {
            density,
            temperature,
        }),
        _ => Err(GridError::AmbiguousAxisBinding(
            ErrorInfo::new(
                "axis_binding",
                "could not locate hden/temperature columns in run summary header",
            )
            .with_context("columns", names.join(", ")),
        )),
    }
}

/// Point reference carried into reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRef {
    /// Grid index.
    pub index: usize,
    /// `log n_H` of the point.
    pub density: f64,
    /// `log T` of the point.
    pub temperature: f64,
    /// Name of the artifact reported for the point.
    pub artifact: String,
}

/// Point retained for table output together with its resolved artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludedPoint {
    /// Point reference.
    pub point: PointRef,
    /// Status after classification (`Ok` or `Warned`).
    pub status: PointStatus,
    /// Resolved per-point artifact.
    pub path: PathBuf,
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    /// Points feeding the output tables, in run-summary order.
    pub included: Vec<IncludedPoint>,
    /// Points flagged as warned by the driver.
    pub warned: Vec<PointRef>,
    /// Points that failed or whose artifact could not be resolved.
    pub failed: Vec<PointRef>,
}

/// Resolves per-point artifacts for classification.
pub trait ArtifactResolver {
    /// Path of the data artifact for a grid index.
    fn resolve(&self, index: usize) -> Result<PathBuf, GridError>;
    /// Name shown in reports for a grid index.
    fn label(&self, index: usize) -> String;
}

impl ArtifactResolver for PointFileLocator {
    fn resolve(&self, index: usize) -> Result<PathBuf, GridError> {
        self.heating_file(index)
    }

    fn label(&self, index: usize) -> String {
        self.artifact_label(index)
    }
}

/// Splits points into included, warned and failed sets.
///
/// Warned points stay included. A point whose artifact cannot be resolved is
/// moved to the failed set even when the driver recorded it as completed.
pub fn classify<R: ArtifactResolver + ?Sized>(
    summary: &RunSummary,
    binding: &AxisBinding,
    resolver: &R,
) -> Result<Classification, GridError> {
    let mut out = Classification::default();
    for point in &summary.points {
        let reference = PointRef {
            index: point.index,
            density: binding.density_of(point),
            temperature: binding.temperature_of(point),
            artifact: resolver.label(point.index),
        };
        match point.status {
            PointStatus::Failed => {
                out.failed.push(reference);
                continue;
            }
            PointStatus::Warned => out.warned.push(reference.clone()),
            PointStatus::Ok => {}
        }
        match resolver.resolve(point.index) {
            Ok(path) => out.included.push(IncludedPoint {
                point: reference,
                status: point.status,
                path,
            }),
            Err(err) if err.is_point_local() => {
                warn!(index = point.index, error = %err, "artifact missing, marking point failed");
                out.failed.push(reference);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}
