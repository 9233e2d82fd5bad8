//! Configuration error types

use std::fmt;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// I/O error
        source: std::io::Error,
    },

    /// The file has no extension to detect a format from
    #[error("Unable to detect config format of {}", .0.display())]
    UndetectedFormat(PathBuf),

    /// The file extension names an unsupported format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The contents do not parse
    #[error("Failed to parse {format}: {message}")]
    Parse {
        /// Format name
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// A referenced environment variable is unset and has no default
    #[error("Environment variable '{0}' not set and no default provided")]
    MissingEnvVar(String),

    /// The configuration parsed but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a new validation error
    pub fn invalid(msg: impl fmt::Display) -> Self {
        Self::Invalid(msg.to_string())
    }

    /// Create a new parse error
    pub fn parse(format: &'static str, msg: impl fmt::Display) -> Self {
        Self::Parse {
            format,
            message: msg.to_string(),
        }
    }
}
