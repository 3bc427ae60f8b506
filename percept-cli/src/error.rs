//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the terminal with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] percept::config::ConfigError),

    #[error("{0}")]
    Usage(String),

    #[error("engine error: {0}")]
    Engine(#[from] percept::EngineError),

    #[error("backend error: {0}")]
    Backend(#[from] percept::BackendError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
