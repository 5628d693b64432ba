use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use cooltab_core::errors::GridError;
use cooltab_grid::{convert_dense, load_config, ConvertOptions};
use tracing::debug;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Grid-definition document with the `vary`/`grid` declarations.
    pub input: PathBuf,
    /// Destination of the dense table container.
    pub output: PathBuf,
    /// Directory holding `<prefix>_run<N>` map files (defaults to the input's directory).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Save-file prefix; inferred from the input's `save` commands when omitted.
    #[arg(long)]
    pub prefix: Option<String>,
    /// Optional YAML configuration; flags take precedence over its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Worker threads used to read map files.
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Fixed provenance timestamp for reproducible manifests.
    #[arg(long)]
    pub timestamp: Option<String>,
}

impl ConvertArgs {
    /// Merges the optional configuration with the command-line overrides.
    pub fn options(&self) -> Result<ConvertOptions, GridError> {
        let mut opts = match &self.config {
            Some(path) => {
                let config = load_config(path)?;
                ConvertOptions::from_config(self.input.clone(), self.output.clone(), &config)
            }
            None => ConvertOptions::new(self.input.clone(), self.output.clone()),
        };
        if let Some(dir) = &self.data_dir {
            opts.data_dir = Some(dir.clone());
        }
        if let Some(prefix) = &self.prefix {
            opts.prefix = Some(prefix.clone());
        }
        if let Some(concurrency) = self.concurrency {
            opts.concurrency = concurrency.max(1);
        }
        if let Some(timestamp) = &self.timestamp {
            opts.timestamp = Some(timestamp.clone());
        }
        Ok(opts)
    }
}

pub fn run(args: &ConvertArgs) -> Result<(), Box<dyn Error>> {
    let opts = args.options()?;
    debug!(?opts, "resolved convert options");
    let conversion = convert_dense(&opts)?;
    let manifest = &conversion.manifest;

    println!(
        "Wrote {} (prefix {}, dims {:?}, {} filled cells)",
        opts.output.display(),
        manifest.prefix,
        manifest.dims,
        manifest.filled_cells
    );
    if !manifest.missing_runs.is_empty() {
        println!(
            "Missing runs ({}): {:?}",
            manifest.missing_runs.len(),
            manifest.missing_runs
        );
    }
    for skipped in &manifest.skipped {
        println!(
            "Skipped run {}: {} ({})",
            skipped.flat + 1,
            skipped.path.display(),
            skipped.error
        );
    }
    println!("Manifest: {}", conversion.manifest_path.display());
    Ok(())
}
