//! Configuration errors.

use gateway_core::GatewayError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A referenced environment variable is not set
    #[error("Environment variable '{0}' is not set")]
    MissingEnv(String),

    /// A field failed validation
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// A model route names a backend that does not exist
    #[error("Model '{model}' references unknown backend '{backend}'")]
    UnknownBackend {
        /// Model name
        model: String,
        /// Backend id
        backend: String,
    },

    /// Two entries share a name
    #[error("Duplicate {kind} '{name}'")]
    Duplicate {
        /// Entry kind
        kind: &'static str,
        /// Duplicated name
        name: String,
    },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<ConfigError> for GatewayError {
    fn from(e: ConfigError) -> Self {
        Self::configuration(e.to_string())
    }
}
