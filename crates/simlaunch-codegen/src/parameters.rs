//! The parameter store: named scalar values shared by the generated program
//! and the job chain.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, CodegenResult};

/// Iterations simulated by one job of a chain.
pub const NITER_TODO: &str = "niter_todo";

/// Time step; every chain needs it.
pub const DT: &str = "dt";

/// Capacity of the `char[]` buffers emitted for string parameters.
const STRING_CAPACITY: usize = 512;

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParameterValue {
    /// Parse a command-line literal. Integers win over floats, anything
    /// else is kept as a string.
    pub fn parse_literal(literal: &str) -> Self {
        let trimmed = literal.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return ParameterValue::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return ParameterValue::Float(v);
        }
        ParameterValue::Str(literal.to_string())
    }

    /// Name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Str(_) => "string",
        }
    }

    /// C++ declaration of a variable named `name` holding this kind of value.
    fn cpp_declaration(&self, name: &str) -> String {
        match self {
            ParameterValue::Int(_) => format!("int {name};\n"),
            ParameterValue::Float(_) => format!("double {name};\n"),
            ParameterValue::Str(_) => format!("char {name}[{STRING_CAPACITY}];\n"),
        }
    }

    /// C++ statement reading the value from an open state handle.
    fn cpp_read(&self, name: &str) -> String {
        match self {
            ParameterValue::Int(_) => {
                format!("    state_read_int(parameter_file, \"parameters/{name}\", &{name});\n")
            }
            ParameterValue::Float(_) => {
                format!("    state_read_double(parameter_file, \"parameters/{name}\", &{name});\n")
            }
            ParameterValue::Str(_) => format!(
                "    state_read_string(parameter_file, \"parameters/{name}\", {name}, {STRING_CAPACITY});\n"
            ),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Int(i64::from(v))
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Str(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Str(v)
    }
}

/// Ordered mapping of parameter names to values. Keys are unique; setting an
/// existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, ParameterValue>,
}

impl Parameters {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Apply a `name=value` assignment, as given on the command line.
    pub fn apply_assignment(&mut self, assignment: &str) -> CodegenResult<()> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| CodegenError::InvalidAssignment(assignment.to_string()))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CodegenError::InvalidAssignment(assignment.to_string()));
        }
        self.set(name, ParameterValue::parse_literal(value));
        Ok(())
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// Whether a value is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look up a required value.
    pub fn require(&self, name: &str) -> CodegenResult<&ParameterValue> {
        self.get(name)
            .ok_or_else(|| CodegenError::MissingParameter(name.to_string()))
    }

    /// Look up a required integer.
    pub fn get_int(&self, name: &str) -> CodegenResult<i64> {
        match self.require(name)? {
            ParameterValue::Int(v) => Ok(*v),
            other => Err(CodegenError::ParameterType {
                name: name.to_string(),
                expected: "int",
                found: other.kind(),
            }),
        }
    }

    /// Look up a required float. Integers are widened.
    pub fn get_float(&self, name: &str) -> CodegenResult<f64> {
        match self.require(name)? {
            ParameterValue::Float(v) => Ok(*v),
            #[allow(clippy::cast_precision_loss)]
            ParameterValue::Int(v) => Ok(*v as f64),
            other => Err(CodegenError::ParameterType {
                name: name.to_string(),
                expected: "float",
                found: other.kind(),
            }),
        }
    }

    /// Insert `value` under `name` unless a value is already present.
    pub fn ensure_default(&mut self, name: &str, value: impl Into<ParameterValue>) {
        self.values
            .entry(name.to_string())
            .or_insert_with(|| value.into());
    }

    /// Make the store usable for a job chain and return `niter_todo`.
    ///
    /// Injects `niter_todo = 1` when absent and requires `dt`.
    pub fn prepare_for_chain(&mut self) -> CodegenResult<i64> {
        self.ensure_default(NITER_TODO, 1_i64);
        self.require(DT)?;
        self.niter_todo()
    }

    /// Iterations per job. Must be a positive integer.
    pub fn niter_todo(&self) -> CodegenResult<i64> {
        let niter = self.get_int(NITER_TODO)?;
        if niter < 1 {
            return Err(CodegenError::ConfigError(format!(
                "{NITER_TODO} must be at least 1, got {niter}"
            )));
        }
        Ok(niter)
    }

    /// Iterate over `(name, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// C++ declarations for every parameter.
    pub fn declarations(&self) -> String {
        self.iter()
            .map(|(name, value)| value.cpp_declaration(name))
            .collect()
    }

    /// The `read_parameters()` function loading every parameter from the
    /// state file named by the global `fname`.
    pub fn read_code(&self) -> String {
        let mut code = String::from("int read_parameters()\n{\n");
        code.push_str("    state_handle parameter_file = state_open(fname, STATE_READ_ONLY);\n");
        for (name, value) in self.iter() {
            code.push_str(&value.cpp_read(name));
        }
        code.push_str("    state_close(parameter_file);\n");
        code.push_str("    return EXIT_SUCCESS;\n}\n\n");
        code
    }
}
