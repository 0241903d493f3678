//! Error types for migrate-core

use crate::stage::StepKind;
use thiserror::Error;

/// Errors that abort a migration run.
///
/// Per-application failures are not errors at this level; they are recorded
/// as failed [`StepResult`](crate::outcome::StepResult)s on the application's
/// outcome so sibling pipelines keep running.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Region outside the supported set
    #[error("invalid region {0:?}; must be one of [e1, e2]")]
    InvalidRegion(String),

    /// Run configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// External tool could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A preflight check failed; nothing has been deleted yet
    #[error("preflight check {check} failed: {message}")]
    Preflight { check: StepKind, message: String },

    /// Serializing the report failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
