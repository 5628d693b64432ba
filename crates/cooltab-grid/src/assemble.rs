use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use cooltab_core::errors::{ErrorInfo, GridError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::index::{GridCoordinate, GridShape};
use crate::series::{load_samples, load_series, ColumnLayout, SampledSeries};

/// Sentinel stored in dense-table cells that no grid point supplied.
pub const MISSING: f64 = f64::NAN;

/// Relative tolerance used when comparing the observed and declared sampling axes.
pub const AXIS_RTOL: f64 = 1e-5;
/// Absolute tolerance used when comparing the observed and declared sampling axes.
pub const AXIS_ATOL: f64 = 1e-8;

/// Returns true when a cell holds the missing sentinel.
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// `-0.0` and `0.0` are the same sample.
fn signless(value: f64) -> f64 {
    value + 0.0
}

/// NaN marks missing cells, so a loaded NaN could not be told apart from a gap.
fn reject_nan(path: &Path, column: &str, values: &[f64]) -> Result<(), GridError> {
    match values.iter().position(|value| value.is_nan()) {
        Some(row) => Err(GridError::MalformedArtifact(
            ErrorInfo::new("artifact_nan", "NaN is not a valid dense-table value")
                .with_path(path)
                .with_context("column", column)
                .with_context("row", row.to_string()),
        )),
        None => Ok(()),
    }
}

/// Sorted, deduplicated union of every point's sample values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnifiedSampleAxis {
    values: Vec<f64>,
}

impl UnifiedSampleAxis {
    /// Builds the axis from any number of per-point sample sets.
    pub fn from_samples<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut values: Vec<f64> = sets.into_iter().flatten().map(|&v| signless(v)).collect();
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| a.total_cmp(b).is_eq());
        Self { values }
    }

    /// Axis values in ascending order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of samples on the axis.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no sample was observed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Exact-match position of `value` on the axis.
    pub fn position(&self, value: f64) -> Option<usize> {
        self.values
            .binary_search_by(|probe| probe.total_cmp(&signless(value)))
            .ok()
    }
}

/// How the observed sampling axis relates to the one declared in the grid document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisAgreement {
    /// Observed values match the declaration directly.
    Raw,
    /// `log10` of the observed values matches the declaration.
    Log10,
    /// Neither form matches within tolerance.
    Mismatch,
}

fn all_close(actual: &[f64], expected: &[f64]) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, b)| (a - b).abs() <= AXIS_ATOL + AXIS_RTOL * b.abs())
}

/// Compares the observed axis with a declared one in raw and `log10` form.
pub fn compare_declared_axis(observed: &UnifiedSampleAxis, declared: &[f64]) -> AxisAgreement {
    if all_close(observed.values(), declared) {
        return AxisAgreement::Raw;
    }
    let logs: Vec<f64> = observed.values().iter().map(|v| v.log10()).collect();
    if all_close(&logs, declared) {
        AxisAgreement::Log10
    } else {
        AxisAgreement::Mismatch
    }
}

/// One dependent field of the dense table, stored row-major over `axes + [samples]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseField {
    /// Field name used as the dataset name on output.
    pub name: String,
    /// Cell values; unfilled cells hold [`MISSING`].
    pub data: Vec<f64>,
}

/// Dense N-D (+1 sampling axis) arrays, one per dependent field.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTable {
    shape: GridShape,
    sample_axis: UnifiedSampleAxis,
    fields: Vec<DenseField>,
}

impl DenseTable {
    /// Allocates a table filled with the missing sentinel.
    pub fn new(shape: GridShape, sample_axis: UnifiedSampleAxis, names: &[String]) -> Self {
        let cells = shape.total() * sample_axis.len();
        let fields = names
            .iter()
            .map(|name| DenseField {
                name: name.clone(),
                data: vec![MISSING; cells],
            })
            .collect();
        Self {
            shape,
            sample_axis,
            fields,
        }
    }

    /// Parameter-axis shape of the table.
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    /// Shared sampling axis.
    pub fn sample_axis(&self) -> &UnifiedSampleAxis {
        &self.sample_axis
    }

    /// Full array dimensions: axis sizes followed by the sampling axis length.
    pub fn dims(&self) -> Vec<usize> {
        let mut dims = self.shape.sizes().to_vec();
        dims.push(self.sample_axis.len());
        dims
    }

    /// Dependent fields in layout order.
    pub fn fields(&self) -> &[DenseField] {
        &self.fields
    }

    /// Looks a field up by name.
    pub fn field(&self, name: &str) -> Option<&DenseField> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn offset(&self, flat: usize, position: usize) -> usize {
        flat * self.sample_axis.len() + position
    }

    /// Value of `field` at a coordinate and sample value; `None` when either is unknown.
    pub fn value_at(&self, field: &str, coordinate: &GridCoordinate, sample: f64) -> Option<f64> {
        let flat = self.shape.flat_of(coordinate).ok()?;
        let position = self.sample_axis.position(sample)?;
        let offset = self.offset(flat, position);
        self.field(field).map(|field| field.data[offset])
    }

    /// Number of cells (per field) holding real data.
    pub fn filled_cells(&self) -> usize {
        self.fields
            .first()
            .map(|field| field.data.iter().filter(|v| !is_missing(**v)).count())
            .unwrap_or(0)
    }

    fn write_point(&mut self, flat: usize, series: &SampledSeries) -> Result<(), GridError> {
        for (row, &sample) in series.samples.iter().enumerate() {
            let Some(position) = self.sample_axis.position(sample) else {
                return Err(GridError::Shape(
                    ErrorInfo::new("sample_not_on_axis", "sample value absent from unified axis")
                        .with_context("flat", flat.to_string())
                        .with_context("sample", sample.to_string()),
                ));
            };
            let offset = self.offset(flat, position);
            for (field, values) in self.fields.iter_mut().zip(&series.fields) {
                field.data[offset] = values[row];
            }
        }
        Ok(())
    }
}

/// Artifact feeding one grid point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSource {
    /// Flat 0-based index of the point.
    pub flat: usize,
    /// Path of the per-point artifact.
    pub path: PathBuf,
}

/// Point left out of the table because its artifact could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPoint {
    /// Flat 0-based index of the point.
    pub flat: usize,
    /// Artifact that failed to load.
    pub path: PathBuf,
    /// Error that excluded the point.
    pub error: GridError,
}

/// Output of [`GridAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Assembled dense table.
    pub table: DenseTable,
    /// Points excluded while loading, in flat-index order.
    pub skipped: Vec<SkippedPoint>,
    /// Comparison against the declared sampling axis, when one was supplied.
    pub axis_agreement: Option<AxisAgreement>,
}

/// Maps `items` on a pool of `concurrency` threads, keeping input order.
pub(crate) fn par_map_ordered<I, T, F>(
    items: &[I],
    concurrency: usize,
    f: F,
) -> Result<Vec<T>, GridError>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .map_err(|err| GridError::Io(ErrorInfo::new("thread_pool", err.to_string())))?;
    Ok(pool.install(|| items.par_iter().map(&f).collect()))
}

pub(crate) fn point_local(err: &GridError) -> bool {
    matches!(
        err,
        GridError::MalformedArtifact(_) | GridError::ArtifactNotFound(_) | GridError::Io(_)
    )
}

/// Two-pass builder turning per-point series into a [`DenseTable`].
#[derive(Debug, Clone)]
pub struct GridAssembler {
    shape: GridShape,
    layout: ColumnLayout,
    field_names: Vec<String>,
    concurrency: usize,
    declared_samples: Option<Vec<f64>>,
}

impl GridAssembler {
    /// Creates an assembler; `field_names` must match the layout's dependent columns.
    pub fn new(
        shape: GridShape,
        layout: ColumnLayout,
        field_names: Vec<String>,
    ) -> Result<Self, GridError> {
        if field_names.len() != layout.fields.len() {
            return Err(GridError::Shape(
                ErrorInfo::new("field_names", "one name is required per dependent column")
                    .with_context("names", field_names.len().to_string())
                    .with_context("columns", layout.fields.len().to_string()),
            ));
        }
        Ok(Self {
            shape,
            layout,
            field_names,
            concurrency: 1,
            declared_samples: None,
        })
    }

    /// Number of worker threads used to read artifacts.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sampling axis declared independently of the data, checked after pass one.
    pub fn with_declared_samples(mut self, declared: Option<Vec<f64>>) -> Self {
        self.declared_samples = declared;
        self
    }

    fn load_each<T, F>(
        &self,
        points: &[PointSource],
        load: F,
    ) -> Result<Vec<Result<T, GridError>>, GridError>
    where
        T: Send,
        F: Fn(&PointSource) -> Result<T, GridError> + Sync,
    {
        par_map_ordered(points, self.concurrency, load)
    }

    fn validate(&self, points: &[PointSource]) -> Result<(), GridError> {
        let total = self.shape.total();
        let mut seen = BTreeSet::new();
        for point in points {
            if point.flat >= total {
                return Err(GridError::Shape(
                    ErrorInfo::new("flat_out_of_range", "point index exceeds grid size")
                        .with_context("flat", point.flat.to_string())
                        .with_context("total", total.to_string()),
                ));
            }
            if !seen.insert(point.flat) {
                return Err(GridError::Shape(
                    ErrorInfo::new("duplicate_point", "grid coordinate supplied twice")
                        .with_context("flat", point.flat.to_string()),
                ));
            }
        }
        Ok(())
    }

    /// Discovers the unified sampling axis, then fills the dense arrays.
    ///
    /// Points whose artifact cannot be read or parsed are skipped; if every
    /// point fails the first error is returned since no sampling axis exists.
    pub fn assemble(&self, points: &[PointSource]) -> Result<Assembly, GridError> {
        self.validate(points)?;
        let mut ordered: Vec<PointSource> = points.to_vec();
        ordered.sort_by_key(|point| point.flat);

        let discovered = self.load_each(&ordered, |point| {
            let samples = load_samples(&point.path, &self.layout)?;
            reject_nan(&point.path, "sample", &samples)?;
            Ok(samples)
        })?;
        let mut skipped = Vec::new();
        let mut kept = Vec::new();
        let mut sample_sets = Vec::new();
        for (point, result) in ordered.into_iter().zip(discovered) {
            match result {
                Ok(samples) => {
                    sample_sets.push(samples);
                    kept.push(point);
                }
                Err(err) if point_local(&err) => {
                    warn!(flat = point.flat, error = %err, "skipping grid point");
                    skipped.push(SkippedPoint {
                        flat: point.flat,
                        path: point.path,
                        error: err,
                    });
                }
                Err(err) => return Err(err),
            }
        }
        if kept.is_empty() {
            if let Some(first) = skipped.first() {
                return Err(first.error.clone());
            }
        }

        let axis = UnifiedSampleAxis::from_samples(sample_sets.iter().map(Vec::as_slice));
        info!(
            points = kept.len(),
            samples = axis.len(),
            "discovered unified sampling axis"
        );
        let axis_agreement = self.declared_samples.as_ref().map(|declared| {
            let agreement = compare_declared_axis(&axis, declared);
            if agreement == AxisAgreement::Mismatch {
                warn!(
                    observed = axis.len(),
                    declared = declared.len(),
                    "sample values in the data do not match the declared sampling grid"
                );
            }
            agreement
        });

        let mut table = DenseTable::new(self.shape.clone(), axis, &self.field_names);
        let loaded = self.load_each(&kept, |point| {
            let series = load_series(&point.path, &self.layout)?;
            for (name, values) in self.field_names.iter().zip(&series.fields) {
                reject_nan(&point.path, name, values)?;
            }
            Ok(series)
        })?;
        for (point, result) in kept.into_iter().zip(loaded) {
            match result {
                Ok(series) => {
                    debug!(flat = point.flat, rows = series.len(), "placing grid point");
                    table.write_point(point.flat, &series)?;
                }
                Err(err) if point_local(&err) => {
                    warn!(flat = point.flat, error = %err, "skipping grid point");
                    skipped.push(SkippedPoint {
                        flat: point.flat,
                        path: point.path,
                        error: err,
                    });
                }
                Err(err) => return Err(err),
            }
        }
        skipped.sort_by_key(|point| point.flat);

        Ok(Assembly {
            table,
            skipped,
            axis_agreement,
        })
    }
}
