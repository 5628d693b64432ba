use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use cooltab_core::errors::GridError;
use cooltab_grid::{load_config, postprocess, GridConfig, PostprocessOptions};
use tracing::debug;

#[derive(Args, Debug)]
pub struct PostprocessArgs {
    /// Directory holding the grid run's artifacts (defaults to the config directory or `.`).
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// Save-file prefix of the grid run.
    #[arg(long)]
    pub prefix: Option<String>,
    /// Destination for flat tables and statistics.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Optional YAML configuration; flags take precedence over its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Fixed header timestamp for reproducible flat tables.
    #[arg(long)]
    pub timestamp: Option<String>,
    /// Worker threads used to read per-point artifacts.
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Entries shown per console category.
    #[arg(long)]
    pub console_limit: Option<usize>,
}

impl PostprocessArgs {
    /// Merges the optional configuration with the command-line overrides.
    pub fn options(&self) -> Result<PostprocessOptions, GridError> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => GridConfig::default(),
        };
        let mut opts = PostprocessOptions::from_config(&config);
        if let Some(dir) = &self.work_dir {
            opts.work_dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            opts.prefix = prefix.clone();
        }
        if let Some(dir) = &self.output_dir {
            opts.output_dir = dir.clone();
        }
        if let Some(timestamp) = &self.timestamp {
            opts.timestamp = Some(timestamp.clone());
        }
        if let Some(concurrency) = self.concurrency {
            opts.concurrency = concurrency.max(1);
        }
        if let Some(limit) = self.console_limit {
            opts.console_limit = limit;
        }
        Ok(opts)
    }
}

pub fn run(args: &PostprocessArgs) -> Result<(), Box<dyn Error>> {
    let opts = args.options()?;
    debug!(?opts, "resolved postprocess options");
    let outcome = postprocess(&opts)?;

    print!("{}", outcome.console);
    println!();
    println!(
        "Wrote {} flat table(s) to {}",
        outcome.flat_files.len(),
        opts.output_dir.display()
    );
    println!("Statistics: {}", outcome.stats_text.display());
    println!("Statistics (JSON): {}", outcome.stats_json.display());
    Ok(())
}
