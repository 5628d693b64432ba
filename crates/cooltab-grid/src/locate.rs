use std::path::{Path, PathBuf};

use cooltab_core::errors::{ErrorInfo, GridError};
use glob::{glob, Pattern};
use tracing::debug;

/// Label recorded in reports when no per-point artifact exists.
pub const LOG_UNAVAILABLE: &str = "<log unavailable>";

/// Resolves `<prefix>_run<N>` map files produced for each flat run index.
#[derive(Debug, Clone)]
pub struct MapFileLocator {
    base_dir: PathBuf,
    prefix: String,
}

impl MapFileLocator {
    /// Creates a locator rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Filename variants tried, in order, for a 1-based run index.
    pub fn candidates(&self, run: usize) -> Vec<PathBuf> {
        let prefix = &self.prefix;
        [
            format!("{prefix}_run{run}.dat"),
            format!("{prefix}_run{run}.txt"),
            format!("{prefix}_run{run:04}.dat"),
            format!("{prefix}_run{run:04}.txt"),
        ]
        .into_iter()
        .map(|name| self.base_dir.join(name))
        .collect()
    }

    /// Returns the first existing candidate for the 1-based run index.
    pub fn locate(&self, run: usize) -> Result<PathBuf, GridError> {
        match self.candidates(run).into_iter().find(|path| path.is_file()) {
            Some(path) => {
                debug!(run, path = %path.display(), "resolved map file");
                Ok(path)
            }
            None => Err(GridError::ArtifactNotFound(
                ErrorInfo::new("map_file_missing", "could not locate map file")
                    .with_context("run", run.to_string())
                    .with_context("prefix", &self.prefix)
                    .with_context("dir", self.base_dir.display().to_string()),
            )),
        }
    }
}

/// Resolves the `grid<9 digits>_<prefix>_*` artifacts written per grid point.
#[derive(Debug, Clone)]
pub struct PointFileLocator {
    base_dir: PathBuf,
    prefix: String,
}

impl PointFileLocator {
    /// Creates a locator rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Directory the locator searches.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File prefix used in save commands.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn point_file(&self, index: usize, kind: &str) -> PathBuf {
        self.base_dir.join(format!("grid{index:09}_{}_{kind}.txt", self.prefix))
    }

    /// Heating table for the point, falling back to the cooling table.
    pub fn heating_file(&self, index: usize) -> Result<PathBuf, GridError> {
        ["heating", "cooling"]
            .into_iter()
            .map(|kind| self.point_file(index, kind))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                GridError::ArtifactNotFound(
                    ErrorInfo::new("heating_file_missing", "heating/cooling file missing")
                        .with_context("index", index.to_string())
                        .with_context("prefix", &self.prefix),
                )
            })
    }

    /// Per-point summary document path (may not exist).
    pub fn summary_file(&self, index: usize) -> PathBuf {
        self.point_file(index, "summary")
    }

    /// Combined summary document `<prefix>_summary.txt`.
    pub fn combined_summary(&self) -> PathBuf {
        self.base_dir.join(format!("{}_summary.txt", self.prefix))
    }

    /// Run-summary table `<prefix>_grid.grd`.
    pub fn run_summary(&self) -> PathBuf {
        self.base_dir.join(format!("{}_grid.grd", self.prefix))
    }

    /// Name of the artifact reported for a point: heating file, else summary, else a placeholder.
    pub fn artifact_label(&self, index: usize) -> String {
        let heating = self.point_file(index, "heating");
        let summary = self.summary_file(index);
        [heating, summary]
            .into_iter()
            .find(|path| path.is_file())
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| LOG_UNAVAILABLE.to_string())
    }

    /// Per-point summary documents present on disk, sorted by name.
    pub fn summary_files(&self) -> Vec<(usize, PathBuf)> {
        let prefix = Pattern::escape(&self.prefix);
        self.glob_sorted(&format!("grid?????????_{prefix}_summary.txt"))
            .into_iter()
            .filter_map(|path| grid_index_of(&path).map(|index| (index, path)))
            .collect()
    }

    /// Simulation output documents: per-point `.out` files, else any `<prefix>*.out`.
    pub fn output_files(&self) -> Vec<PathBuf> {
        let prefix = Pattern::escape(&self.prefix);
        let per_point = self.glob_sorted(&format!("grid?????????_{prefix}_*.out"));
        if !per_point.is_empty() {
            return per_point;
        }
        self.glob_sorted(&format!("{prefix}*.out"))
    }

    fn glob_sorted(&self, pattern: &str) -> Vec<PathBuf> {
        let Some(base) = self.base_dir.to_str() else {
            return Vec::new();
        };
        let full = Path::new(&Pattern::escape(base)).join(pattern);
        let Some(full) = full.to_str() else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = match glob(full) {
            Ok(entries) => entries.filter_map(Result::ok).collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();
        paths
    }
}

/// Extracts the 9-digit grid index from a `grid#########_...` file name.
pub fn grid_index_of(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix("grid")?.get(..9)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) || name.as_bytes().get(13) != Some(&b'_') {
        return None;
    }
    digits.parse().ok()
}
