use std::fs;
use std::path::Path;

use cooltab_core::errors::{ErrorInfo, GridError};
use serde::{Deserialize, Serialize};

/// Column positions of the sample variable and the dependent fields in a data line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    /// Zero-based column of the sampling variable.
    pub sample: usize,
    /// Zero-based columns of the dependent fields, in output order.
    pub fields: Vec<usize>,
}

impl ColumnLayout {
    /// Layout of a flat cooling map: `sample, field_1, .., field_n` in consecutive columns.
    pub fn leading_sample(field_count: usize) -> Self {
        Self {
            sample: 0,
            fields: (1..=field_count).collect(),
        }
    }

    /// Minimum number of columns a data line must carry.
    pub fn required_columns(&self) -> usize {
        self.fields
            .iter()
            .copied()
            .chain(std::iter::once(self.sample))
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Parallel sample/field sequences loaded from one artifact.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampledSeries {
    /// Sampling variable values in file order.
    pub samples: Vec<f64>,
    /// One sequence per dependent field, each as long as `samples`.
    pub fields: Vec<Vec<f64>>,
}

impl SampledSeries {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true when no data row was read.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Field values of row `row`, in layout order.
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.samples.len() {
            return None;
        }
        Some(self.fields.iter().map(|field| field[row]).collect())
    }
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

fn parse_value(raw: &str, source: &str, line_no: usize) -> Result<f64, GridError> {
    let malformed = |message: String| {
        GridError::MalformedArtifact(
            ErrorInfo::new("artifact_value", message)
                .with_context("source", source)
                .with_context("line", line_no.to_string())
                .with_context("token", raw),
        )
    };
    raw.parse::<f64>().map_err(|err| malformed(err.to_string()))
}

/// Parses data lines into a series, stopping after `limit` rows when given.
pub fn parse_series(
    text: &str,
    layout: &ColumnLayout,
    source: &str,
    limit: Option<usize>,
) -> Result<SampledSeries, GridError> {
    let required = layout.required_columns();
    let mut series = SampledSeries {
        samples: Vec::new(),
        fields: vec![Vec::new(); layout.fields.len()],
    };
    for (line_no, line) in data_lines(text) {
        if limit.is_some_and(|limit| series.len() >= limit) {
            break;
        }
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < required {
            return Err(GridError::MalformedArtifact(
                ErrorInfo::new("artifact_columns", "data line has too few columns")
                    .with_context("source", source)
                    .with_context("line", line_no.to_string())
                    .with_context("expected", required.to_string())
                    .with_context("found", columns.len().to_string()),
            ));
        }
        series
            .samples
            .push(parse_value(columns[layout.sample], source, line_no)?);
        for (field, &column) in series.fields.iter_mut().zip(&layout.fields) {
            field.push(parse_value(columns[column], source, line_no)?);
        }
    }
    Ok(series)
}

/// Reads only the sample column of an artifact, still validating every line against `layout`.
pub fn parse_samples(
    text: &str,
    layout: &ColumnLayout,
    source: &str,
) -> Result<Vec<f64>, GridError> {
    Ok(parse_series(text, layout, source, None)?.samples)
}

fn read_artifact(path: &Path) -> Result<String, GridError> {
    fs::read_to_string(path).map_err(|err| GridError::io("artifact_read", path, err))
}

/// Loads the full series of one per-point artifact.
pub fn load_series(path: &Path, layout: &ColumnLayout) -> Result<SampledSeries, GridError> {
    let text = read_artifact(path)?;
    parse_series(&text, layout, &path.display().to_string(), None)
}

/// Loads the sample column of one per-point artifact.
pub fn load_samples(path: &Path, layout: &ColumnLayout) -> Result<Vec<f64>, GridError> {
    let text = read_artifact(path)?;
    parse_samples(&text, layout, &path.display().to_string())
}

/// Loads the first data row of an artifact; an artifact without data rows is malformed.
pub fn load_first_row(path: &Path, layout: &ColumnLayout) -> Result<(f64, Vec<f64>), GridError> {
    let text = read_artifact(path)?;
    let series = parse_series(&text, layout, &path.display().to_string(), Some(1))?;
    match series.row(0) {
        Some(fields) => Ok((series.samples[0], fields)),
        None => Err(GridError::MalformedArtifact(
            ErrorInfo::new("artifact_empty", "no data rows found")
                .with_context("source", path.display().to_string()),
        )),
    }
}
