//! Configuration validation

use crate::error::{ConfigError, Result};
use crate::BupsConfig;
use std::collections::HashSet;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validate configuration
pub fn validate_config(config: &BupsConfig) -> Result<()> {
    validate_plugins(config)?;
    validate_collaborators(config)?;
    validate_logging(config)?;

    Ok(())
}

fn validate_plugins(config: &BupsConfig) -> Result<()> {
    let mut seen = HashSet::new();

    for plugin in &config.plugins {
        if plugin.name.is_empty() {
            return Err(ConfigError::invalid("plugin name cannot be empty"));
        }

        if plugin.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid(format!(
                "plugin '{}' path cannot be empty",
                plugin.name
            )));
        }

        if !seen.insert(plugin.name.as_str()) {
            return Err(ConfigError::invalid(format!(
                "duplicate plugin name: {}",
                plugin.name
            )));
        }
    }

    if config.enabled_plugins().next().is_none() {
        tracing::warn!("No plugins enabled");
    }

    Ok(())
}

fn validate_collaborators(config: &BupsConfig) -> Result<()> {
    if config.collaborators.stdout_mode().is_none() {
        return Err(ConfigError::invalid(format!(
            "Invalid stdout mode: {} (must be stdout or buffer)",
            config.collaborators.stdout
        )));
    }

    if let Some(ref path) = config.collaborators.config_file {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("config_file cannot be empty"));
        }
    }

    Ok(())
}

fn validate_logging(config: &BupsConfig) -> Result<()> {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::invalid(format!(
            "Invalid log level: {}",
            config.logging.level
        )));
    }

    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::invalid(format!(
            "Invalid log format: {} (must be text or json)",
            config.logging.format
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use std::path::PathBuf;

    fn minimal_config() -> BupsConfig {
        BupsConfig {
            plugins: vec![PluginSpec {
                name: "backup".to_string(),
                path: PathBuf::from("/opt/bups/libbackup.so"),
                enabled: true,
            }],
            collaborators: CollaboratorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_minimal_config() {
        assert!(validate_config(&minimal_config()).is_ok());
        assert!(validate_config(&BupsConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_plugin_path() {
        let mut config = minimal_config();
        config.plugins[0].path = PathBuf::new();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_plugin_name() {
        let mut config = minimal_config();
        let mut duplicate = config.plugins[0].clone();
        duplicate.enabled = false;
        config.plugins.push(duplicate);

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate plugin name"));
    }

    #[test]
    fn test_invalid_stdout_mode() {
        let mut config = minimal_config();
        config.collaborators.stdout = "stderr".to_string();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_level() {
        let mut config = minimal_config();
        config.logging.level = "WARN".to_string();
        assert!(validate_config(&config).is_ok());

        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_format() {
        let mut config = minimal_config();
        config.logging.format = "xml".to_string();

        assert!(validate_config(&config).is_err());
    }
}
