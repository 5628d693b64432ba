#![deny(missing_docs)]
#![doc = "Grid-result assembly and diagnostics for per-point cooling-grid runs."]

/// Two-pass dense table assembly.
pub mod assemble;
/// YAML configuration schema.
pub mod config;
pub mod derived;
/// Flat per-density cooling map writer.
pub mod flat;
/// Grid-definition parsing and axis expansion.
pub mod gridspec;
/// Canonical hashing helpers.
pub mod hash;
/// Flat index and coordinate conversion.
pub mod index;
/// Artifact discovery on disk.
pub mod locate;
pub mod pipeline;
/// Statistics document and console summary.
pub mod report;
/// Canonical JSON serde helpers.
pub mod serde;
/// Per-point sampled series loading.
pub mod series;
/// Run-summary parsing and point classification.
pub mod status;
/// Execution-time extraction and histogram.
pub mod timing;
/// Warning scanning and aggregation.
pub mod warnings;
pub mod writer;

pub use assemble::{
    compare_declared_axis, is_missing, Assembly, AxisAgreement, DenseField, DenseTable,
    GridAssembler, PointSource, SkippedPoint, UnifiedSampleAxis, MISSING,
};
pub use config::{load_config, GridConfig};
pub use derived::{load_molecular_weights, MolecularWeights};
pub use flat::{format_exp, FlatRow, FlatTableWriter};
pub use gridspec::{
    expand_range, infer_prefix, parse_grid_ranges, parse_grid_spec, GridRange, GridSpec,
    ParameterAxis,
};
pub use index::{coordinate_of, flat_of, GridCoordinate, GridShape};
pub use locate::{MapFileLocator, PointFileLocator};
pub use pipeline::{
    convert_dense, postprocess, ConvertOptions, DenseConversion, DenseManifest,
    PostprocessOptions, PostprocessOutcome,
};
pub use report::StatisticsReport;
pub use series::{load_series, parse_series, ColumnLayout, SampledSeries};
pub use status::{
    bind_axes, classify, parse_run_summary, AxisBinding, Classification, GridPoint, PointRef,
    PointStatus, RunSummary,
};
pub use timing::ExecTimeHistogram;
pub use warnings::{WarningAggregator, WarningRecord};
pub use writer::{read_dense_table, write_dense_table, DenseContainer};
