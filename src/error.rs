//! Error types for the VoteSmash test harness.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for harness operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while touching the log or the test tree.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse config file {}: {reason}", .path.display())]
    ConfigParse { path: PathBuf, reason: String },

    /// Dependency cycle detected in the test catalog.
    #[error("dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// The operator picked a mode or argument the harness cannot act on.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A mode needs a value that no flag, variable or prompt supplied.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// A test script could not be launched.
    #[error("failed to spawn {command}: {reason}")]
    Spawn { command: String, reason: String },

    /// The run summary could not be serialized.
    #[error("failed to serialize run summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
