//! Plugin error types

use std::fmt;

/// Error a plugin reports from [`Plugin::start`](crate::Plugin::start)
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Initialization failed
    #[error("Initialization failed: {0}")]
    InitError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// Relayed arguments could not be used
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// A capability the plugin needs was never injected
    #[error("Missing capability: {0}")]
    MissingCapability(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

impl PluginError {
    /// Create a new initialization error
    pub fn init(msg: impl fmt::Display) -> Self {
        Self::InitError(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::ConfigError(msg.to_string())
    }

    /// Create a new runtime error
    pub fn runtime(msg: impl fmt::Display) -> Self {
        Self::RuntimeError(msg.to_string())
    }

    /// Create a new invalid arguments error
    pub fn invalid_args(msg: impl fmt::Display) -> Self {
        Self::InvalidArgs(msg.to_string())
    }

    /// Create a new missing capability error
    pub fn missing(capability: impl fmt::Display) -> Self {
        Self::MissingCapability(capability.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PluginError::init("test");
        assert!(matches!(err, PluginError::InitError(_)));

        let err = PluginError::config("test");
        assert!(matches!(err, PluginError::ConfigError(_)));

        let err = PluginError::invalid_args("--bind");
        assert!(matches!(err, PluginError::InvalidArgs(_)));
    }

    #[test]
    fn test_error_display() {
        let err = PluginError::RuntimeError("dump exited with 2".to_string());
        assert_eq!(err.to_string(), "Runtime error: dump exited with 2");

        let err = PluginError::missing(crate::Capability::ConfigRead);
        assert_eq!(err.to_string(), "Missing capability: config_read");
    }
}
