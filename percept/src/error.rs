//! Run-terminating error types.
//!
//! Only two failures abort a run: an invalid configuration and a starting
//! back end that fails to come up. Everything else (candidate start
//! failures, per-frame process errors, stop errors, degraded metric
//! readings) is recovered locally and surfaced through logs and events.

use thiserror::Error;

use crate::backend::{ApproachId, BackendError};
use crate::config::ConfigError;

/// Errors that terminate an engine run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration was malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The starting back end failed to start; there is nothing to run.
    #[error("initial backend '{approach}' failed to start: {source}")]
    InitialBackendStart {
        approach: ApproachId,
        source: BackendError,
    },
}
