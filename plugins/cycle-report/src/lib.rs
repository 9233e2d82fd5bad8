//! # Cycle Report Plugin
//!
//! Callback-phase plugin that reports every finished backup cycle on the
//! host's shared output stream and through the plugin log sink.
//!
//! Build it as a `cdylib` and list the library in `bups.yaml`:
//!
//! ```yaml
//! plugins:
//!   - name: cycle-report
//!     path: ./target/release/libcycle_report.so
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

use bups_plugin_api::prelude::*;
use std::sync::Arc;

/// Plugin name
pub const NAME: &str = "cycle-report";

/// Reports finished backup cycles
#[derive(Debug, Default)]
pub struct CycleReportPlugin {
    logger: Option<PluginLogger>,
    stdout: Option<Arc<dyn OutputStream>>,
    reported: u64,
}

impl CycleReportPlugin {
    /// Create a new plugin instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cycles reported so far
    pub fn reported(&self) -> u64 {
        self.reported
    }
}

impl Plugin for CycleReportPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn phase(&self) -> PhaseTag {
        LifecyclePhase::Callback.into()
    }

    fn capabilities(&self) -> Vec<CapabilityTag> {
        vec![Capability::LogSink.into(), Capability::SharedStdout.into()]
    }

    fn start(&mut self, _args: Option<&[String]>) -> Result<(), PluginError> {
        let stdout = self
            .stdout
            .as_ref()
            .ok_or_else(|| PluginError::missing(Capability::SharedStdout))?;

        self.reported += 1;
        stdout.write_line(&format!("backup cycle {} complete", self.reported))?;
        stdout.flush()?;

        if let Some(logger) = &self.logger {
            logger.info(format!("reported cycle {}", self.reported));
        }

        Ok(())
    }

    fn set_logger(&mut self, logger: PluginLogger) {
        self.logger = Some(logger);
    }

    fn set_stdout(&mut self, stdout: Arc<dyn OutputStream>) {
        self.stdout = Some(stdout);
    }
}

bups_plugin_api::declare_plugin!(CycleReportPlugin::new);

#[cfg(test)]
mod tests {
    use super::*;
    use bups_plugin_runtime::{
        BackupCycle, BufferStream, Collaborators, PluginRegistry, StaticResolver,
    };

    fn create() -> Box<dyn Plugin> {
        Box::new(CycleReportPlugin::new())
    }

    #[test]
    fn test_plugin_metadata() {
        let plugin = CycleReportPlugin::new();
        assert_eq!(plugin.name(), "cycle-report");
        assert_eq!(
            LifecyclePhase::try_from(plugin.phase()),
            Ok(LifecyclePhase::Callback)
        );
        assert_eq!(plugin.capabilities().len(), 2);
    }

    #[test]
    fn test_start_without_stdout() {
        let mut plugin = CycleReportPlugin::new();
        let err = plugin.start(None).unwrap_err();
        assert!(matches!(err, PluginError::MissingCapability(_)));
        assert_eq!(plugin.reported(), 0);
    }

    #[test]
    fn test_declaration() {
        assert_eq!(bups_plugin_declaration.api_version, bups_plugin_api::PLUGIN_API_VERSION);
        assert_eq!((bups_plugin_declaration.create)().name(), NAME);
    }

    #[test]
    fn test_reports_each_cycle() {
        let stdout = Arc::new(BufferStream::new());
        let registry = Arc::new(PluginRegistry::new(
            Collaborators::builder().stdout(stdout.clone()).build(),
            Arc::new(StaticResolver::new().with(NAME, create)),
        ));

        registry.register(NAME).unwrap();

        let mut cycle = BackupCycle::new(registry);
        cycle.run(2, None).unwrap();

        assert_eq!(
            stdout.to_string_lossy(),
            "backup cycle 1 complete\nbackup cycle 2 complete\n"
        );
    }
}
