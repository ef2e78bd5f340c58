//! Error handling for source generation and builds.

use thiserror::Error;

/// Result type for codegen operations.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Errors that can occur while preparing, assembling or building a program.
#[derive(Error, Debug)]
pub enum CodegenError {
    /// A parameter the caller relies on is absent.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A parameter holds a value of the wrong kind.
    #[error("Parameter {name} has the wrong type: expected {expected}, found {found}")]
    ParameterType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A `name=value` assignment could not be parsed.
    #[error("Invalid parameter assignment: {0}")]
    InvalidAssignment(String),

    /// The simulation state file already exists and would be overwritten.
    #[error("State file already exists: {0}")]
    StateFileExists(String),

    /// Unknown simulation variant identifier.
    #[error("Unknown simulation kind: '{0}'. Available: NavierStokes, FluidResize")]
    UnknownSimulation(String),

    /// A header the generated program includes is not installed.
    #[error("Required header not found: {0}")]
    MissingHeader(String),

    /// The compiler ran but reported failure.
    #[error("Compilation failed ({status}): {command}")]
    CompilerFailed { command: String, status: String },

    /// An external command could not be started.
    #[error("Command failed: {command} - {message}")]
    CommandError { command: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),
}
