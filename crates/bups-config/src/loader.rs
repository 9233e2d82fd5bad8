//! Configuration loading

use crate::error::{ConfigError, Result};
use crate::{BupsConfig, ConfigFormat};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load configuration from a file.
///
/// Relative plugin and config-file paths are resolved against the directory
/// holding `path`.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<BupsConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let format = ConfigFormat::from_path(path)?;
    let mut config = load_from_str(&content, format)?;

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    debug!(
        path = %path.display(),
        format = format.as_str(),
        plugins = config.plugins.len(),
        "Configuration loaded"
    );

    Ok(config)
}

/// Expand environment variables in configuration string.
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| ConfigError::invalid(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];

        let value = match (env::var(var_name), cap.get(3)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => return Err(ConfigError::MissingEnvVar(var_name.to_string())),
        };

        result.push_str(&content[last_match..whole.start()]);
        result.push_str(&value);
        last_match = whole.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<BupsConfig> {
    let expanded = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::parse(format.as_str(), e))?
        }
        ConfigFormat::Toml => {
            toml::from_str(&expanded).map_err(|e| ConfigError::parse(format.as_str(), e))?
        }
        ConfigFormat::Json => {
            serde_json::from_str(&expanded).map_err(|e| ConfigError::parse(format.as_str(), e))?
        }
    };

    Ok(config)
}

/// Load configuration from a file and validate it
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BupsConfig> {
    let config = load_from_file(path)?;
    crate::validator::validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const YAML_CONFIG: &str = r#"
plugins:
  - name: web_config
    path: /opt/bups/libweb_config.so
  - name: backup
    path: /opt/bups/libbackup.so
  - name: upload
    path: /opt/bups/libupload.so
    enabled: false

collaborators:
  config_file: /etc/bups/plugins.toml
  stdout: buffer

logging:
  level: debug
  format: json
"#;

    #[test]
    fn test_load_yaml() {
        let config = load_from_str(YAML_CONFIG, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.plugins.len(), 3);
        assert_eq!(config.enabled_plugins().count(), 2);
        assert_eq!(
            config.collaborators.config_file,
            Some(PathBuf::from("/etc/bups/plugins.toml"))
        );
        assert_eq!(config.collaborators.stdout, "buffer");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_load_toml() {
        let content = r#"
[[plugins]]
name = "cycle-report"
path = "/opt/bups/libcycle_report.so"

[logging]
level = "warn"
"#;

        let config = load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.plugins[0].name, "cycle-report");
        assert!(config.plugins[0].enabled);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_load_empty_json() {
        let config = load_from_str("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config, BupsConfig::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("plugins: [yaml", ConfigFormat::Yaml);
        assert!(matches!(result, Err(ConfigError::Parse { format: "YAML", .. })));
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("BUPS_TEST_PLUGIN_DIR", "/srv/bups");

        let config = load_from_str(
            r#"
plugins:
  - name: backup
    path: "${BUPS_TEST_PLUGIN_DIR}/libbackup.so"
"#,
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.plugins[0].path, PathBuf::from("/srv/bups/libbackup.so"));

        env::remove_var("BUPS_TEST_PLUGIN_DIR");
    }

    #[test]
    fn test_env_var_with_default() {
        env::remove_var("BUPS_TEST_UNDEFINED_LEVEL");

        let config = load_from_str(
            "logging:\n  level: \"${BUPS_TEST_UNDEFINED_LEVEL:-trace}\"\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_env_var_override_default() {
        env::set_var("BUPS_TEST_STDOUT", "buffer");

        let config = load_from_str(
            "collaborators:\n  stdout: \"${BUPS_TEST_STDOUT:-stdout}\"\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.collaborators.stdout, "buffer");

        env::remove_var("BUPS_TEST_STDOUT");
    }

    #[test]
    fn test_missing_env_var_no_default() {
        env::remove_var("BUPS_TEST_MISSING");

        let result = load_from_str("logging:\n  level: \"${BUPS_TEST_MISSING}\"\n", ConfigFormat::Yaml);
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
        assert!(err.to_string().contains("BUPS_TEST_MISSING"));
    }

    #[test]
    fn test_multiple_env_vars() {
        env::set_var("BUPS_TEST_DB_HOST", "localhost");
        env::set_var("BUPS_TEST_DB_PORT", "3306");

        let expanded = expand_env_vars("mysql://${BUPS_TEST_DB_HOST}:${BUPS_TEST_DB_PORT}/shop").unwrap();
        assert_eq!(expanded, "mysql://localhost:3306/shop");

        env::remove_var("BUPS_TEST_DB_HOST");
        env::remove_var("BUPS_TEST_DB_PORT");
    }

    #[test]
    fn test_load_from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bups.yaml");
        fs::write(
            &path,
            "plugins:\n  - name: cycle-report\n    path: plugins/libcycle_report.so\ncollaborators:\n  config_file: plugins.toml\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.plugins[0].path,
            dir.path().join("plugins/libcycle_report.so")
        );
        assert_eq!(
            config.collaborators.config_file,
            Some(dir.path().join("plugins.toml"))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_from_file("/definitely/not/here/bups.yaml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bups.json");
        fs::write(&path, r#"{"logging": {"level": "loud"}}"#).unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
