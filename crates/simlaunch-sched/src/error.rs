//! Error handling for partitioning and submission.

use simlaunch_codegen::CodegenError;
use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur while planning or submitting a job chain.
///
/// None of these are retried: configuration errors are raised before any
/// external process starts, and a submission error stops the chain.
#[derive(Error, Debug)]
pub enum SchedError {
    /// The requested processes/threads cannot be placed on the host.
    #[error("Invalid resource request: {0}")]
    InvalidResourceRequest(String),

    /// A host field the selected backend needs is not set.
    #[error("Host type {host_type} requires `{field}` to be set")]
    MissingHostField {
        host_type: String,
        field: &'static str,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The submission command exited non-zero.
    #[error("Submission failed: {command} - {message}")]
    SubmitError { command: String, message: String },

    /// The submission command's output did not contain a job id.
    #[error("Could not parse job id from {command} output: {output}")]
    UnparseableJobId { command: String, output: String },

    /// A directly executed run exited non-zero.
    #[error("Run failed ({status}): {command}")]
    ExecutionFailed { command: String, status: String },

    /// An external command could not be started.
    #[error("Command failed: {command} - {message}")]
    CommandError { command: String, message: String },

    /// Parameter or state file error.
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),
}
