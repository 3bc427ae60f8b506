//! Logging setup: console plus an optional per-session log file.
//!
//! `RUST_LOG` overrides the default filter. The file writer is
//! non-blocking; the returned guard must stay alive for the whole session
//! or buffered lines are lost on exit.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::CliError;

/// Initialize the global subscriber.
///
/// Logs go to stderr so per-frame results on stdout stay pipeable. With a
/// log directory, a timestamped session file is written as well.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let filename = format!(
                "percept-{}.log",
                chrono::Local::now().format("%Y%m%d-%H%M%S")
            );
            let (writer, guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::never(dir, filename),
            );
            let file = fmt::layer().with_writer(writer).with_ansi(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            Ok(None)
        }
    }
}
