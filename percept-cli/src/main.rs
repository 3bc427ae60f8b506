//! Percept command-line interface.

mod commands;
mod error;
mod logging;
mod sink;
mod source;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::config::ConfigCommands;
use crate::commands::run::RunArgs;
use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "percept", version = percept::VERSION)]
#[command(about = "Adaptive gesture recognition sessions")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for timestamped session log files (default: logs/ for
    /// `run`, disabled for other commands)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a recognition session
    Run(RunArgs),

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().or_else(|| {
        matches!(cli.command, Commands::Run(_)).then(|| PathBuf::from("logs"))
    });
    let _guard = match logging::init(cli.verbose, log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result: Result<(), CliError> = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
