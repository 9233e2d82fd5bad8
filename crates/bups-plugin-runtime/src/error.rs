//! Plugin runtime error types

use bups_plugin_api::{LifecyclePhase, PluginError};
use std::fmt;
use std::path::PathBuf;

/// Failure to turn a module path into a plugin factory
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Nothing exists at the path
    #[error("Plugin module not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be opened as a shared library
    #[error("Failed to open plugin module {}: {source}", path.display())]
    Open {
        /// Module path
        path: PathBuf,
        /// Loader error
        source: libloading::Error,
    },

    /// The library does not export the plugin declaration
    #[error("Plugin module {} does not export `{symbol}`: {source}", path.display())]
    MissingSymbol {
        /// Module path
        path: PathBuf,
        /// Symbol that was looked up
        symbol: &'static str,
        /// Loader error
        source: libloading::Error,
    },

    /// The library was built against an incompatible plugin API
    #[error(
        "Plugin module {} was built against plugin API {found}, host provides {expected}",
        path.display()
    )]
    IncompatibleApi {
        /// Module path
        path: PathBuf,
        /// API version recorded in the module
        found: String,
        /// API version of the host
        expected: String,
    },

    /// No linked-in factory is registered under the requested key
    #[error("No linked-in plugin registered for {0}")]
    UnknownModule(String),
}

/// A plugin set that cannot safely run.
///
/// Every variant aborts the registration that discovered it and leaves the
/// registry unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The module could not be loaded
    #[error("Failed to load plugin module: {0}")]
    Load(#[from] LoadError),

    /// The plugin declared a capability tag outside the known set
    #[error("Plugin '{plugin}' declares unsupported capability tag {tag}")]
    UnsupportedCapability {
        /// Plugin name
        plugin: String,
        /// Raw tag
        tag: u32,
    },

    /// The plugin declared a phase tag outside the known set
    #[error("Plugin '{plugin}' declares unsupported phase tag {tag}")]
    UnsupportedPhase {
        /// Plugin name
        plugin: String,
        /// Raw tag
        tag: u32,
    },

    /// A plugin with the same name is already registered
    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(String),
}

/// Registry error type
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registration failed
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A plugin's start operation failed
    #[error("Plugin '{plugin}' failed during {phase}: {source}")]
    Module {
        /// Plugin name
        plugin: String,
        /// Phase that was running
        phase: LifecyclePhase,
        /// Error reported by the plugin
        source: PluginError,
    },

    /// Plugin not found
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// Arguments were relayed to a plugin that does not accept them
    #[error("Plugin '{0}' does not accept relayed arguments")]
    NotArgsAware(String),
}

/// Result type for plugin runtime operations
pub type Result<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    /// Create a new plugin not found error
    pub fn not_found(name: impl fmt::Display) -> Self {
        Self::PluginNotFound(name.to_string())
    }

    /// Whether this error comes from a misconfigured plugin set
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl ConfigurationError {
    /// Create a new duplicate plugin error
    pub fn duplicate(name: impl fmt::Display) -> Self {
        Self::DuplicatePlugin(name.to_string())
    }
}
