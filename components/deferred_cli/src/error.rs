//! Error types for the CLI

use deferred::LoopError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The event loop refused or aborted a run
    #[error("event loop error: {0}")]
    Loop(#[from] LoopError),

    /// Scenario arguments that cannot describe a run
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Report serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
