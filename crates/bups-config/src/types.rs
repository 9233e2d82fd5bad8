//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BupsConfig {
    /// Plugin modules, registered in this order
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,

    /// Collaborators handed to plugins
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BupsConfig {
    /// Plugins with `enabled: true`, in declaration order
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &PluginSpec> {
        self.plugins.iter().filter(|p| p.enabled)
    }

    /// Look up a plugin entry by name
    pub fn plugin(&self, name: &str) -> Option<&PluginSpec> {
        self.plugins.iter().find(|p| p.name == name)
    }

    /// Resolve relative paths against `base`, usually the config file's directory
    pub fn resolve_paths(&mut self, base: &Path) {
        for plugin in &mut self.plugins {
            plugin.path = rebase(base, &plugin.path);
        }

        if let Some(config_file) = self.collaborators.config_file.take() {
            self.collaborators.config_file = Some(rebase(base, &config_file));
        }
    }
}

fn rebase(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() && !path.as_os_str().is_empty() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// One plugin module
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginSpec {
    /// Plugin name, expected to match the name the module reports
    pub name: String,

    /// Path to the shared library
    pub path: PathBuf,

    /// Whether to register the module
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollaboratorsConfig {
    /// File behind the config read/write stream (in memory when unset)
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Shared output stream: "stdout" or "buffer"
    #[serde(default = "default_stdout")]
    pub stdout: String,
}

impl CollaboratorsConfig {
    /// Parsed output stream mode
    pub fn stdout_mode(&self) -> Option<StdoutMode> {
        StdoutMode::parse(&self.stdout)
    }
}

/// Where the shared output stream writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutMode {
    /// Process stdout
    Stdout,
    /// In-memory buffer
    Buffer,
}

impl StdoutMode {
    /// Parse a mode name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stdout" => Some(StdoutMode::Stdout),
            "buffer" => Some(StdoutMode::Buffer),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_format")]
    pub format: String,
}

impl LoggingConfig {
    /// Whether JSON output is selected
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            stdout: default_stdout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stdout() -> String {
    "stdout".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}
