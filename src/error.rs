//! Error types for configuration, linear solves and the simulation run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading or reading the parameter tree.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read parameter file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("section '{0}' not found")]
    MissingSection(String),

    #[error("parameter '{key}' not found in section '{section}'")]
    MissingKey { section: String, key: String },

    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Failures inside the banded LU factorization and solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("matrix is singular (zero pivot at row {row})")]
    Singular { row: usize },

    #[error("non-finite value encountered at row {row}")]
    NonFinite { row: usize },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// The pluggable behaviors selected by a model string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Forcing,
    Temperature,
    Viscosity,
    Boundary,
    Advection,
    Diffusion,
    FluxLimiter,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::Forcing => "forcing model",
            ModelFamily::Temperature => "temperature model",
            ModelFamily::Viscosity => "viscosity model",
            ModelFamily::Boundary => "boundary model",
            ModelFamily::Advection => "advection method",
            ModelFamily::Diffusion => "diffusion method",
            ModelFamily::FluxLimiter => "flux limiter",
        };
        f.write_str(name)
    }
}

/// Fatal conditions that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unexpected {family}: '{name}'")]
    InvalidModelSelection { family: ModelFamily, name: String },

    #[error("{operation} failed: {source}")]
    SolverFailure {
        operation: &'static str,
        #[source]
        source: SolverError,
    },
}

impl SimError {
    pub fn invalid_model(family: ModelFamily, name: &str) -> Self {
        SimError::InvalidModelSelection {
            family,
            name: name.to_string(),
        }
    }

    pub fn solver(operation: &'static str, source: SolverError) -> Self {
        SimError::SolverFailure { operation, source }
    }
}

/// Failures while persisting a snapshot.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}
