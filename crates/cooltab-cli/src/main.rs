use std::error::Error;

use clap::{ArgAction, Parser, Subcommand};
use commands::{
    convert::{self, ConvertArgs},
    postprocess::{self, PostprocessArgs},
};

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(
    name = "cooltab",
    version,
    about = "Cooling-grid table assembly and run diagnostics"
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble `<prefix>_run<N>` map files into a dense multi-dimensional table.
    Convert(ConvertArgs),
    /// Write flat cooling maps and a statistics report for a finished grid run.
    Postprocess(PostprocessArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    match cli.command {
        Command::Convert(args) => convert::run(&args),
        Command::Postprocess(args) => postprocess::run(&args),
    }
}
