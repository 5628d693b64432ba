//! End-to-end conversion and post-processing runs.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use cooltab_core::errors::GridError;
use cooltab_core::provenance::{SchemaVersion, TableProvenance};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assemble::{
    par_map_ordered, point_local, AxisAgreement, DenseTable, GridAssembler, PointSource,
    SkippedPoint,
};
use crate::config::{default_field_names, GridConfig, DEFAULT_PREFIX, DEFAULT_SAMPLE_LABEL};
use crate::derived::load_molecular_weights;
use crate::flat::{FlatRow, FlatTableWriter, TIMESTAMP_FORMAT};
use crate::gridspec::{infer_prefix, parse_grid_spec};
use crate::hash::digest_bytes;
use crate::index::GridShape;
use crate::locate::{grid_index_of, MapFileLocator, PointFileLocator};
use crate::report::{StatisticsReport, DEFAULT_CONSOLE_LIMIT};
use crate::serde::to_canonical_json_bytes;
use crate::series::{load_first_row, ColumnLayout};
use crate::status::{bind_axes, classify, load_run_summary, IncludedPoint};
use crate::timing::{extract_exec_times, ExecTimeHistogram};
use crate::warnings::WarningAggregator;
use crate::writer::{write_atomic, write_dense_table, DenseContainer};

fn read_document(path: &Path, code: &str) -> Result<Vec<u8>, GridError> {
    fs::read(path).map_err(|err| GridError::io(code, path, err))
}

fn read_lossy(path: &Path) -> Result<String, GridError> {
    Ok(String::from_utf8_lossy(&read_document(path, "log_read")?).into_owned())
}

fn provenance(input: &Path, bytes: &[u8], created_at: Option<&str>) -> TableProvenance {
    let mut tool_versions = BTreeMap::new();
    tool_versions.insert("cooltab-grid".to_string(), env!("CARGO_PKG_VERSION").to_string());
    TableProvenance {
        input_hash: digest_bytes(bytes),
        input_path: input.display().to_string(),
        created_at: created_at
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        schema: SchemaVersion::default(),
        tool_versions,
    }
}

/// Inputs of [`convert_dense`].
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Grid-definition document.
    pub input: PathBuf,
    /// Destination of the dense table container.
    pub output: PathBuf,
    /// Directory with `<prefix>_run<N>` map files; defaults to the input's directory.
    pub data_dir: Option<PathBuf>,
    /// Prefix override; otherwise inferred from `save` commands.
    pub prefix: Option<String>,
    /// Dataset name of the sampling axis.
    pub sample_label: String,
    /// Dependent field names in map-file column order.
    pub field_names: Vec<String>,
    /// Worker threads used to read map files.
    pub concurrency: usize,
    /// Fixed provenance timestamp.
    pub timestamp: Option<String>,
}

impl ConvertOptions {
    /// Options with default labels and fields.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            data_dir: None,
            prefix: None,
            sample_label: DEFAULT_SAMPLE_LABEL.to_string(),
            field_names: default_field_names(),
            concurrency: 1,
            timestamp: None,
        }
    }

    /// Options taking labels, fields, directories and concurrency from `config`.
    ///
    /// The prefix is left to inference from the grid document.
    pub fn from_config(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        config: &GridConfig,
    ) -> Self {
        Self {
            data_dir: config.data_dir(),
            sample_label: config.sample_label.clone(),
            field_names: config.field_names.clone(),
            concurrency: config.concurrency,
            timestamp: config.timestamp.clone(),
            ..Self::new(input, output)
        }
    }
}

/// Machine-readable description of a dense conversion, written next to the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseManifest {
    /// Prefix the map files were resolved with.
    pub prefix: String,
    /// Parameter axis names in declaration order.
    pub axes: Vec<String>,
    /// Field array dimensions (axis sizes then samples).
    pub dims: Vec<usize>,
    /// Dataset names in container order.
    pub datasets: Vec<String>,
    /// 1-based runs without a map file.
    pub missing_runs: Vec<usize>,
    /// Points whose map file could not be read.
    pub skipped: Vec<SkippedPoint>,
    /// Declared sampling-axis comparison, when declared.
    pub axis_agreement: Option<AxisAgreement>,
    /// Cells (per field) holding data.
    pub filled_cells: usize,
    /// Provenance of the grid-definition document.
    pub provenance: TableProvenance,
}

/// Result of [`convert_dense`].
#[derive(Debug, Clone)]
pub struct DenseConversion {
    /// Assembled table.
    pub table: DenseTable,
    /// Manifest written to `<output>.json`.
    pub manifest: DenseManifest,
    /// Path of the manifest.
    pub manifest_path: PathBuf,
}

/// `<output>.json` next to the container.
pub fn manifest_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".json");
    PathBuf::from(name)
}

/// Converts per-run map files declared by a grid document into a dense table container.
pub fn convert_dense(opts: &ConvertOptions) -> Result<DenseConversion, GridError> {
    let bytes = read_document(&opts.input, "grid_spec_read")?;
    let text = String::from_utf8_lossy(&bytes);
    let spec = parse_grid_spec(&text)?;
    let stem = opts
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = opts
        .prefix
        .clone()
        .unwrap_or_else(|| infer_prefix(&text, &stem));
    let base_dir = opts.data_dir.clone().unwrap_or_else(|| {
        opts.input
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });

    let shape = GridShape::new(spec.axis_sizes())?;
    info!(prefix = %prefix, dims = ?shape.sizes(), runs = shape.total(), "converting grid");
    let locator = MapFileLocator::new(&base_dir, &prefix);
    let mut points = Vec::new();
    let mut missing_runs = Vec::new();
    let mut first_missing = None;
    for flat in 0..shape.total() {
        match locator.locate(flat + 1) {
            Ok(path) => points.push(PointSource { flat, path }),
            Err(err) if err.is_point_local() => {
                warn!(run = flat + 1, "map file missing, leaving cells empty");
                missing_runs.push(flat + 1);
                first_missing.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    if points.is_empty() {
        if let Some(err) = first_missing {
            return Err(err);
        }
    }

    let assembler = GridAssembler::new(
        shape,
        ColumnLayout::leading_sample(opts.field_names.len()),
        opts.field_names.clone(),
    )?
    .with_concurrency(opts.concurrency)
    .with_declared_samples(spec.sampling.as_ref().map(|axis| axis.values.clone()));
    let assembly = assembler.assemble(&points)?;

    let container = DenseContainer::from_table(&assembly.table, &opts.sample_label, &spec.axes);
    write_dense_table(&opts.output, &container)?;

    let manifest = DenseManifest {
        prefix,
        axes: spec.axes.iter().map(|axis| axis.name.clone()).collect(),
        dims: assembly.table.dims(),
        datasets: container.datasets.iter().map(|d| d.name.clone()).collect(),
        missing_runs,
        skipped: assembly.skipped,
        axis_agreement: assembly.axis_agreement,
        filled_cells: assembly.table.filled_cells(),
        provenance: provenance(&opts.input, &bytes, opts.timestamp.as_deref()),
    };
    let manifest_path = manifest_path(&opts.output);
    write_atomic(&manifest_path, &to_canonical_json_bytes(&manifest)?)?;

    Ok(DenseConversion {
        table: assembly.table,
        manifest,
        manifest_path,
    })
}

/// Inputs of [`postprocess`].
#[derive(Debug, Clone)]
pub struct PostprocessOptions {
    /// Directory holding the grid run's artifacts.
    pub work_dir: PathBuf,
    /// Destination for flat tables and statistics.
    pub output_dir: PathBuf,
    /// Save-file prefix.
    pub prefix: String,
    /// Header timestamp; the current local time when unset.
    pub timestamp: Option<String>,
    /// Worker threads used to read per-point artifacts.
    pub concurrency: usize,
    /// Entries per console category.
    pub console_limit: usize,
}

impl PostprocessOptions {
    /// Options for `work_dir` with the stock prefix.
    pub fn new(work_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output_dir: output_dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            timestamp: None,
            concurrency: 1,
            console_limit: DEFAULT_CONSOLE_LIMIT,
        }
    }

    /// Options taken entirely from `config`.
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            work_dir: config.work_dir().unwrap_or_else(|| config.base_dir.clone()),
            output_dir: config.output_dir(),
            prefix: config.prefix.clone(),
            timestamp: config.timestamp.clone(),
            concurrency: config.concurrency,
            console_limit: config.console_limit,
        }
    }
}

/// Result of [`postprocess`].
#[derive(Debug, Clone)]
pub struct PostprocessOutcome {
    /// Aggregated diagnostics.
    pub report: StatisticsReport,
    /// Flat tables written, in run order.
    pub flat_files: Vec<PathBuf>,
    /// Statistics text document.
    pub stats_text: PathBuf,
    /// Statistics JSON sidecar.
    pub stats_json: PathBuf,
    /// Console summary rendered with the configured limit.
    pub console: String,
}

/// Heating file layout: `depth, Te, Htot, Ctot`.
fn heating_layout() -> ColumnLayout {
    ColumnLayout {
        sample: 1,
        fields: vec![2, 3],
    }
}

/// Turns a finished grid run into flat cooling maps plus a statistics report.
pub fn postprocess(opts: &PostprocessOptions) -> Result<PostprocessOutcome, GridError> {
    let locator = PointFileLocator::new(&opts.work_dir, &opts.prefix);
    let summary_path = locator.run_summary();
    let summary = load_run_summary(&summary_path)?;
    let summary_bytes = read_document(&summary_path, "run_summary_read")?;
    let binding = bind_axes(&summary.param_names)?;
    let weights = load_molecular_weights(&locator)?;

    let mut times = Vec::new();
    let outputs = locator.output_files();
    for path in &outputs {
        times.extend(extract_exec_times(&read_lossy(path)?));
    }

    let mut classification = classify(&summary, &binding, &locator)?;
    let layout = heating_layout();
    let loaded = par_map_ordered(
        &classification.included,
        opts.concurrency,
        |point: &IncludedPoint| load_first_row(&point.path, &layout),
    )?;

    let mut rows = Vec::with_capacity(loaded.len());
    let mut included = 0usize;
    for (point, result) in classification.included.iter().zip(loaded) {
        let (_, fields) = match result {
            Ok(row) => row,
            Err(err) if point_local(&err) => {
                warn!(
                    index = point.point.index,
                    error = %err,
                    "unreadable artifact, marking point failed"
                );
                classification.failed.push(point.point.clone());
                continue;
            }
            Err(err) => return Err(err),
        };
        let mmw = weights.require(point.point.index)?;
        rows.push(FlatRow::from_point(
            point.point.density,
            point.point.temperature,
            fields[0],
            fields[1],
            mmw,
        ));
        included += 1;
    }
    classification.failed.sort_by_key(|point| point.index);

    let timestamp = opts
        .timestamp
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format(TIMESTAMP_FORMAT).to_string());
    let writer = FlatTableWriter::new(&opts.output_dir, &opts.prefix, &timestamp);
    let flat_files = writer.write(&rows)?;

    let warned_indices: Vec<usize> = classification.warned.iter().map(|p| p.index).collect();
    let all_indices: Vec<usize> = summary.points.iter().map(|p| p.index).collect();
    let mut aggregator = WarningAggregator::new(&warned_indices, &all_indices);
    for path in &outputs {
        aggregator.add_output(grid_index_of(path), &read_lossy(path)?);
    }
    for (index, path) in locator.summary_files() {
        aggregator.add_point_summary(index, &read_lossy(&path)?);
    }
    let combined = locator.combined_summary();
    if combined.is_file() {
        aggregator.add_combined_summary(&read_lossy(&combined)?);
    }
    let coordinates: BTreeMap<usize, (f64, f64)> = summary
        .points
        .iter()
        .map(|p| (p.index, (binding.density_of(p), binding.temperature_of(p))))
        .collect();

    let report = StatisticsReport {
        histogram: ExecTimeHistogram::from_times(times),
        warnings: aggregator.records(&coordinates),
        warned: classification.warned,
        failed: classification.failed,
        included,
        provenance: provenance(&summary_path, &summary_bytes, opts.timestamp.as_deref()),
    };
    let (stats_text, stats_json) = report.write(&opts.output_dir, &opts.prefix)?;
    info!(
        included,
        warned = report.warned.len(),
        failed = report.failed.len(),
        "post-processing finished"
    );
    let console = report.console_summary(opts.console_limit);
    Ok(PostprocessOutcome {
        report,
        flat_files,
        stats_text,
        stats_json,
        console,
    })
}
