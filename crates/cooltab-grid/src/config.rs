use std::fs;
use std::path::{Path, PathBuf};

use cooltab_core::errors::GridError;
use serde::{Deserialize, Serialize};

use crate::report::DEFAULT_CONSOLE_LIMIT;
use crate::serde::from_yaml_slice;

/// Save-file prefix used by the stock cooling-grid input.
pub const DEFAULT_PREFIX: &str = "isrf_ism";
/// Directory receiving flat tables and statistics.
pub const DEFAULT_OUTPUT_DIR: &str = "converted_cooling_tables";
/// Name of the sampling-axis dataset.
pub const DEFAULT_SAMPLE_LABEL: &str = "Temperature";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_concurrency() -> usize {
    1
}

fn default_console_limit() -> usize {
    DEFAULT_CONSOLE_LIMIT
}

fn default_sample_label() -> String {
    DEFAULT_SAMPLE_LABEL.to_string()
}

/// Dependent field names of the dense table, in flat-table column order.
pub fn default_field_names() -> Vec<String> {
    ["Heating", "Cooling", "MMW"].map(String::from).to_vec()
}

/// Optional YAML configuration shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Save-file prefix of the grid run.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Directory holding the simulation artifacts for post-processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    /// Directory holding `<prefix>_run<N>` map files for dense conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Destination for flat tables and statistics.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Worker threads used to read per-point artifacts.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Entries shown per console category.
    #[serde(default = "default_console_limit")]
    pub console_limit: usize,
    /// Dataset name of the sampling axis.
    #[serde(default = "default_sample_label")]
    pub sample_label: String,
    /// Dependent field names in column order.
    #[serde(default = "default_field_names")]
    pub field_names: Vec<String>,
    /// Fixed header timestamp for reproducible flat tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            work_dir: None,
            data_dir: None,
            output_dir: default_output_dir(),
            concurrency: default_concurrency(),
            console_limit: default_console_limit(),
            sample_label: default_sample_label(),
            field_names: default_field_names(),
            timestamp: None,
            base_dir: PathBuf::from("."),
        }
    }
}

impl GridConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Output directory resolved against the config location.
    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Working directory resolved against the config location, if set.
    pub fn work_dir(&self) -> Option<PathBuf> {
        self.work_dir.as_deref().map(|dir| self.resolve(dir))
    }

    /// Data directory resolved against the config location, if set.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_deref().map(|dir| self.resolve(dir))
    }
}

/// Loads a configuration file; relative paths resolve against its directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GridConfig, GridError> {
    let config_path = path.as_ref();
    let bytes = fs::read(config_path).map_err(|err| GridError::io("config_read", config_path, err))?;
    let mut config: GridConfig = from_yaml_slice(&bytes)?;
    config.base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok(config)
}
