//! # Config Show Plugin
//!
//! Init-phase plugin for inspecting and replacing the shared plugin
//! configuration from the command line.
//!
//! During the ordinary `Init` run it receives no arguments and stays off. The
//! host can relay a command line to it:
//!
//! ```text
//! bups plugin config-show -- --switch on
//! bups plugin config-show -- --replace '[upload]
//! bucket = "nightly"'
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

use bups_plugin_api::prelude::*;
use clap::{Parser, ValueEnum};
use std::sync::Arc;

/// Plugin name
pub const NAME: &str = "config-show";

/// Relayed command line
#[derive(Debug, Parser)]
#[command(name = NAME, no_binary_name = true)]
struct Options {
    /// Print the configuration
    #[arg(long, value_enum, default_value_t = Switch::Off)]
    switch: Switch,

    /// Replace the configuration with this text
    #[arg(long)]
    replace: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

/// Shows or replaces the shared configuration
#[derive(Debug, Default)]
pub struct ConfigShowPlugin {
    logger: Option<PluginLogger>,
    stdout: Option<Arc<dyn OutputStream>>,
    reader: Option<Arc<dyn ConfigReader>>,
    writer: Option<Arc<dyn ConfigWriter>>,
}

impl ConfigShowPlugin {
    /// Create a new plugin instance
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, message: impl AsRef<str>) {
        if let Some(logger) = &self.logger {
            logger.info(message);
        }
    }
}

impl Plugin for ConfigShowPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn phase(&self) -> PhaseTag {
        LifecyclePhase::Init.into()
    }

    fn capabilities(&self) -> Vec<CapabilityTag> {
        vec![
            Capability::SharedStdout.into(),
            Capability::ArgsDelivery.into(),
            Capability::ConfigWrite.into(),
            Capability::ConfigRead.into(),
            Capability::LogSink.into(),
        ]
    }

    fn start(&mut self, args: Option<&[String]>) -> Result<(), PluginError> {
        let options = Options::try_parse_from(args.unwrap_or_default())
            .map_err(|e| PluginError::invalid_args(e.to_string().trim_end()))?;

        let stdout = self
            .stdout
            .as_ref()
            .ok_or_else(|| PluginError::missing(Capability::SharedStdout))?;

        if let Some(contents) = &options.replace {
            let writer = self
                .writer
                .as_ref()
                .ok_or_else(|| PluginError::missing(Capability::ConfigWrite))?;
            writer.write_config(contents.as_bytes())?;
            stdout.write_line(&format!("wrote {} bytes", contents.len()))?;
            self.log(format!("configuration replaced ({} bytes)", contents.len()));
        }

        if options.switch == Switch::Off {
            stdout.write_line("off")?;
            self.log("off");
            return Ok(());
        }

        let reader = self
            .reader
            .as_ref()
            .ok_or_else(|| PluginError::missing(Capability::ConfigRead))?;
        let contents = reader
            .read_config_string()
            .map_err(|e| PluginError::config(format!("unreadable configuration: {e}")))?;

        stdout.write_all(contents.as_bytes())?;
        if !contents.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
        self.log("configuration shown");

        Ok(())
    }

    fn set_logger(&mut self, logger: PluginLogger) {
        self.logger = Some(logger);
    }

    fn set_config_reader(&mut self, reader: Arc<dyn ConfigReader>) {
        self.reader = Some(reader);
    }

    fn set_config_writer(&mut self, writer: Arc<dyn ConfigWriter>) {
        self.writer = Some(writer);
    }

    fn set_stdout(&mut self, stdout: Arc<dyn OutputStream>) {
        self.stdout = Some(stdout);
    }
}

bups_plugin_api::declare_plugin!(ConfigShowPlugin::new);
