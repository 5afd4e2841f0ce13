//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or is invalid
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File contents could not be parsed
    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// File extension is not YAML or TOML
    #[error("unsupported config format: {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    /// Environment override has a bad value
    #[error("invalid value for {name}: {message}")]
    InvalidEnv {
        /// Variable name
        name: String,
        /// Reason
        message: String,
    },

    /// Semantic validation failed
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an environment override error
    pub fn invalid_env(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnv {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ConfigError>;
