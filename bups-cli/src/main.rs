//! bups CLI

use anyhow::{bail, Context, Result};
use bups_config::{load_config, BupsConfig, StdoutMode};
use bups_plugin_runtime::{
    BackupCycle, BufferStream, Collaborators, ConfigFile, DylibResolver, MemoryConfig,
    PluginRegistry,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bups")]
#[command(about = "Plugin-driven backup utility", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the configured plugins and run backup cycles
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "bups.yaml")]
        config: PathBuf,

        /// Number of backup cycles to run
        #[arg(short = 'n', long, default_value_t = 1)]
        cycles: u64,

        /// Arguments relayed to argument-aware cycle-start plugins
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// List registered plugins with their phase and capabilities
    Plugins {
        /// Path to configuration file
        #[arg(short, long, default_value = "bups.yaml")]
        config: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Relay a command line to one argument-aware plugin
    Plugin {
        /// Path to configuration file
        #[arg(short, long, default_value = "bups.yaml")]
        config: PathBuf,

        /// Plugin name
        name: String,

        /// Arguments for the plugin
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "bups.yaml")]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

/// A registry built from configuration, plus the output buffer when one is used
struct Host {
    registry: Arc<PluginRegistry>,
    buffer: Option<Arc<BufferStream>>,
}

impl Host {
    /// Write buffered plugin output to stdout
    fn flush_buffer(&self) {
        if let Some(buffer) = &self.buffer {
            let output = buffer.take();
            if !output.is_empty() {
                tracing::debug!(bytes = output.len(), "Flushing buffered plugin output");
                print!("{}", String::from_utf8_lossy(&output));
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            cycles,
            args,
        } => {
            let config = load(&config, cli.log_level.as_deref())?;
            let host = build_host(&config)?;

            tracing::info!(cycles, plugins = host.registry.len(), "Starting backup");

            let args = (!args.is_empty()).then_some(args);
            let mut cycle = BackupCycle::new(Arc::clone(&host.registry));
            let result = cycle.run(cycles, args.as_deref());

            host.flush_buffer();
            result?;

            tracing::info!(
                completed = cycle.completed_cycles(),
                "Backup finished"
            );
            Ok(())
        }

        Commands::Plugins { config, json } => {
            let config = load(&config, cli.log_level.as_deref())?;
            let host = build_host(&config)?;

            if json {
                let summaries = host.registry.describe();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }

            println!("{:<4}{:<24}{:<14}CAPABILITIES", "#", "NAME", "PHASE");
            for (index, summary) in host.registry.describe().iter().enumerate() {
                let capabilities: Vec<_> = summary
                    .capabilities
                    .iter()
                    .map(|c| c.as_str())
                    .collect();
                println!(
                    "{:<4}{:<24}{:<14}{}",
                    index,
                    summary.name,
                    summary.phase.as_str(),
                    capabilities.join(", ")
                );
            }
            Ok(())
        }

        Commands::Plugin { config, name, args } => {
            let config = load(&config, cli.log_level.as_deref())?;
            let host = build_host(&config)?;

            let result = host.registry.relay_args(&name, &args);
            host.flush_buffer();
            result.with_context(|| format!("Plugin '{name}' rejected the relayed arguments"))?;

            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Plugins: {}", cfg.plugins.len());
                    tracing::info!("  Enabled: {}", cfg.enabled_plugins().count());
                    tracing::info!("  Stdout: {}", cfg.collaborators.stdout);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("bups backup utility");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Plugin API: {}", bups_plugin_runtime::PLUGIN_API_VERSION);
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

/// Load configuration and install the subscriber it describes
fn load(path: &Path, log_level: Option<&str>) -> Result<BupsConfig> {
    let config = load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    init_tracing(
        log_level.unwrap_or(config.logging.level.as_str()),
        config.logging.is_json(),
    )?;

    tracing::debug!(config = %path.display(), "Configuration loaded");

    Ok(config)
}

/// Build collaborators and register every enabled plugin, in order
fn build_host(config: &BupsConfig) -> Result<Host> {
    let mut builder = Collaborators::builder();

    builder = match &config.collaborators.config_file {
        Some(path) => builder.config(Arc::new(ConfigFile::new(path))),
        None => builder.config(Arc::new(MemoryConfig::default())),
    };

    let buffer = match config.collaborators.stdout_mode() {
        Some(StdoutMode::Stdout) => None,
        Some(StdoutMode::Buffer) => {
            let buffer = Arc::new(BufferStream::new());
            builder = builder.stdout(buffer.clone());
            Some(buffer)
        }
        None => bail!("Invalid stdout mode: {}", config.collaborators.stdout),
    };

    let registry = Arc::new(PluginRegistry::new(
        builder.build(),
        Arc::new(DylibResolver::new()),
    ));

    for spec in config.enabled_plugins() {
        registry
            .register(&spec.path)
            .with_context(|| format!("Failed to register plugin '{}'", spec.name))?;

        if registry.capabilities(&spec.name).is_none() {
            tracing::warn!(
                plugin = %spec.name,
                path = %spec.path.display(),
                "Module registered under a different name than configured"
            );
        }
    }

    Ok(Host { registry, buffer })
}

/// Parse a log level, rejecting what the config validator rejects
fn parse_level(level: &str) -> Result<tracing::Level> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => bail!("Invalid log level: {level} (must be trace, debug, info, warn or error)"),
    };

    Ok(filter)
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = parse_level(level)?;

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into()));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true),
            )
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bups_config::{CollaboratorsConfig, PluginSpec};

    #[test]
    fn test_parse_run_with_relayed_args() {
        let cli = Cli::try_parse_from([
            "bups",
            "--log-level",
            "debug",
            "run",
            "--config",
            "/etc/bups/bups.yaml",
            "-n",
            "3",
            "--",
            "--database",
            "shop",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Run {
                config,
                cycles,
                args,
            } => {
                assert_eq!(config, PathBuf::from("/etc/bups/bups.yaml"));
                assert_eq!(cycles, 3);
                assert_eq!(args, vec!["--database", "shop"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_plugin() {
        let cli =
            Cli::try_parse_from(["bups", "plugin", "config-show", "--", "-switch", "on"]).unwrap();

        match cli.command {
            Commands::Plugin { config, name, args } => {
                assert_eq!(config, PathBuf::from("bups.yaml"));
                assert_eq!(name, "config-show");
                assert_eq!(args, vec!["-switch", "on"]);
            }
            _ => panic!("expected plugin"),
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN").unwrap(), tracing::Level::WARN);
        assert_eq!(parse_level("trace").unwrap(), tracing::Level::TRACE);

        let err = parse_level("verbose").unwrap_err();
        assert!(err.to_string().contains("Invalid log level: verbose"));
    }

    #[test]
    fn test_unknown_log_level_flag_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bups.yaml");
        std::fs::write(&path, "logging:\n  level: info\n").unwrap();

        let err = load(&path, Some("loud")).unwrap_err();
        assert!(err.to_string().contains("Invalid log level: loud"));
    }

    #[test]
    fn test_build_host_without_plugins() {
        let config = BupsConfig {
            collaborators: CollaboratorsConfig {
                config_file: None,
                stdout: "buffer".to_string(),
            },
            ..BupsConfig::default()
        };

        let host = build_host(&config).unwrap();
        assert!(host.registry.is_empty());
        assert!(host.buffer.is_some());
    }

    #[test]
    fn test_build_host_missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let config = BupsConfig {
            plugins: vec![PluginSpec {
                name: "backup".to_string(),
                path: dir.path().join("libbackup.so"),
                enabled: true,
            }],
            ..BupsConfig::default()
        };

        let err = build_host(&config).err().unwrap();
        assert!(err.to_string().contains("Failed to register plugin 'backup'"));
    }

    #[test]
    fn test_disabled_plugins_are_skipped() {
        let config = BupsConfig {
            plugins: vec![PluginSpec {
                name: "upload".to_string(),
                path: PathBuf::from("/nowhere/libupload.so"),
                enabled: false,
            }],
            ..BupsConfig::default()
        };

        let host = build_host(&config).unwrap();
        assert!(host.registry.is_empty());
        assert!(host.buffer.is_none());
    }
}
