//! Mock implementations for testing

use crate::capability::{Capability, CapabilityTag};
use crate::collaborator::{ConfigReader, ConfigWriter, LogSink, OutputStream, PluginLogger};
use crate::phase::{LifecyclePhase, PhaseTag};
use crate::plugin::Plugin;
use crate::PluginError;
use std::sync::{Arc, Mutex};
use tracing::Level;

/// Shared, ordered log of plugin starts across several mocks
pub type Journal = Arc<Mutex<Vec<String>>>;

/// One recorded call to [`Plugin::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCall {
    /// Arguments the host passed
    pub args: Option<Vec<String>>,
    /// Whether a logger had been injected before the call
    pub had_logger: bool,
    /// Whether a config reader had been injected before the call
    pub had_config_reader: bool,
    /// Whether a config writer had been injected before the call
    pub had_config_writer: bool,
    /// Whether the shared stdout had been injected before the call
    pub had_stdout: bool,
}

#[derive(Debug, Default)]
struct Record {
    starts: Vec<StartCall>,
    logger_sets: usize,
    config_reader_sets: usize,
    config_writer_sets: usize,
    stdout_sets: usize,
    logger_namespace: Option<String>,
}

/// Observer for a [`MockPlugin`] that has been moved into a registry
#[derive(Debug, Clone)]
pub struct MockHandle {
    record: Arc<Mutex<Record>>,
}

impl MockHandle {
    /// Number of start calls
    pub fn start_count(&self) -> usize {
        self.record.lock().unwrap().starts.len()
    }

    /// Every recorded start call, in order
    pub fn start_calls(&self) -> Vec<StartCall> {
        self.record.lock().unwrap().starts.clone()
    }

    /// Number of logger injections
    pub fn logger_set_count(&self) -> usize {
        self.record.lock().unwrap().logger_sets
    }

    /// Number of config reader injections
    pub fn config_reader_set_count(&self) -> usize {
        self.record.lock().unwrap().config_reader_sets
    }

    /// Number of config writer injections
    pub fn config_writer_set_count(&self) -> usize {
        self.record.lock().unwrap().config_writer_sets
    }

    /// Number of stdout injections
    pub fn stdout_set_count(&self) -> usize {
        self.record.lock().unwrap().stdout_sets
    }

    /// Namespace of the injected logger, if any
    pub fn logger_namespace(&self) -> Option<String> {
        self.record.lock().unwrap().logger_namespace.clone()
    }
}

/// Mock plugin for testing
#[derive(Debug)]
pub struct MockPlugin {
    name: String,
    phase: PhaseTag,
    capabilities: Vec<CapabilityTag>,
    fail_with: Option<String>,
    journal: Option<Journal>,
    record: Arc<Mutex<Record>>,
    logger: Option<PluginLogger>,
    config_reader: Option<Arc<dyn ConfigReader>>,
    config_writer: Option<Arc<dyn ConfigWriter>>,
    stdout: Option<Arc<dyn OutputStream>>,
}

impl MockPlugin {
    /// Create a new mock plugin with no capabilities
    pub fn new(name: impl Into<String>, phase: LifecyclePhase) -> Self {
        Self {
            name: name.into(),
            phase: phase.tag(),
            capabilities: Vec::new(),
            fail_with: None,
            journal: None,
            record: Arc::new(Mutex::new(Record::default())),
            logger: None,
            config_reader: None,
            config_writer: None,
            stdout: None,
        }
    }

    /// Declare capabilities
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities
            .extend(capabilities.into_iter().map(Capability::tag));
        self
    }

    /// Declare a raw capability tag, which may be outside the known set
    pub fn with_raw_capability(mut self, tag: u32) -> Self {
        self.capabilities.push(CapabilityTag(tag));
        self
    }

    /// Declare a raw phase tag, which may be outside the known set
    pub fn with_raw_phase(mut self, tag: u32) -> Self {
        self.phase = PhaseTag(tag);
        self
    }

    /// Make every start call fail with a runtime error
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Append the plugin name to `journal` on every start
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Handle to observe the mock after it is boxed
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            record: Arc::clone(&self.record),
        }
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> PhaseTag {
        self.phase
    }

    fn capabilities(&self) -> Vec<CapabilityTag> {
        self.capabilities.clone()
    }

    fn start(&mut self, args: Option<&[String]>) -> Result<(), PluginError> {
        self.record.lock().unwrap().starts.push(StartCall {
            args: args.map(<[String]>::to_vec),
            had_logger: self.logger.is_some(),
            had_config_reader: self.config_reader.is_some(),
            had_config_writer: self.config_writer.is_some(),
            had_stdout: self.stdout.is_some(),
        });

        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(self.name.clone());
        }

        if let Some(logger) = &self.logger {
            logger.info("started");
        }

        match &self.fail_with {
            Some(message) => Err(PluginError::runtime(message)),
            None => Ok(()),
        }
    }

    fn set_logger(&mut self, logger: PluginLogger) {
        let mut record = self.record.lock().unwrap();
        record.logger_sets += 1;
        record.logger_namespace = Some(logger.namespace().to_string());
        self.logger = Some(logger);
    }

    fn set_config_reader(&mut self, reader: Arc<dyn ConfigReader>) {
        self.record.lock().unwrap().config_reader_sets += 1;
        self.config_reader = Some(reader);
    }

    fn set_config_writer(&mut self, writer: Arc<dyn ConfigWriter>) {
        self.record.lock().unwrap().config_writer_sets += 1;
        self.config_writer = Some(writer);
    }

    fn set_stdout(&mut self, stdout: Arc<dyn OutputStream>) {
        self.record.lock().unwrap().stdout_sets += 1;
        self.stdout = Some(stdout);
    }
}

/// Log sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct RecordingLogSink {
    records: Mutex<Vec<(Level, String, String)>>,
}

impl RecordingLogSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(level, namespace, message)` triples
    pub fn records(&self) -> Vec<(Level, String, String)> {
        self.records.lock().unwrap().clone()
    }
}

impl LogSink for RecordingLogSink {
    fn log(&self, level: Level, namespace: &str, message: &str) {
        self.records
            .lock()
            .unwrap()
            .push((level, namespace.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_start() {
        let mut plugin = MockPlugin::new("backup", LifecyclePhase::CycleStart)
            .with_capabilities([Capability::ArgsDelivery]);
        let handle = plugin.handle();

        let args = vec!["--debug".to_string()];
        plugin.start(Some(&args)).unwrap();
        plugin.start(None).unwrap();

        let calls = handle.start_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, Some(args));
        assert_eq!(calls[1].args, None);
        assert!(!calls[0].had_logger);
    }

    #[test]
    fn test_failing_mock() {
        let mut plugin = MockPlugin::new("upload", LifecyclePhase::Callback).failing("bucket gone");
        let err = plugin.start(None).unwrap_err();
        assert!(err.to_string().contains("bucket gone"));
        assert_eq!(plugin.handle().start_count(), 1);
    }

    #[test]
    fn test_raw_tags() {
        let plugin = MockPlugin::new("odd", LifecyclePhase::Init)
            .with_raw_capability(9)
            .with_raw_phase(7);
        assert_eq!(plugin.capabilities(), vec![CapabilityTag(9)]);
        assert_eq!(plugin.phase(), PhaseTag(7));
    }
}
