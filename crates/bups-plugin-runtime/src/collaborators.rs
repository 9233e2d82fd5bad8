//! Host-side collaborators injected into plugins

use bups_plugin_api::{ConfigReader, ConfigWriter, LogSink, OutputStream, PluginLogger};
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

/// Forwards plugin log records to `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink {
    _private: (),
}

impl TracingLogSink {
    /// Create a new tracing sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for TracingLogSink {
    fn log(&self, level: Level, namespace: &str, message: &str) {
        if level == Level::ERROR {
            tracing::error!(target: "bups::plugin", namespace, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "bups::plugin", namespace, "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "bups::plugin", namespace, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "bups::plugin", namespace, "{message}");
        } else {
            tracing::trace!(target: "bups::plugin", namespace, "{message}");
        }
    }
}

/// Configuration stream backed by a file.
///
/// Reads return the whole file. Writes replace it through a sibling
/// temporary file so readers never observe a half-written configuration.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConfigFile {
    /// Use the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigReader for ConfigFile {
    fn read_config(&self) -> io::Result<Vec<u8>> {
        let _guard = self.lock.lock();
        fs::read(&self.path)
    }
}

impl ConfigWriter for ConfigFile {
    fn write_config(&self, contents: &[u8]) -> io::Result<()> {
        let _guard = self.lock.lock();
        let staging = self.staging_path();
        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)
    }
}

/// In-memory configuration stream
#[derive(Debug, Default)]
pub struct MemoryConfig {
    contents: Mutex<Vec<u8>>,
}

impl MemoryConfig {
    /// Create a stream holding `contents`
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: Mutex::new(contents.into()),
        }
    }

    /// Current contents
    pub fn contents(&self) -> Vec<u8> {
        self.contents.lock().clone()
    }
}

impl ConfigReader for MemoryConfig {
    fn read_config(&self) -> io::Result<Vec<u8>> {
        Ok(self.contents.lock().clone())
    }
}

impl ConfigWriter for MemoryConfig {
    fn write_config(&self, contents: &[u8]) -> io::Result<()> {
        *self.contents.lock() = contents.to_vec();
        Ok(())
    }
}

/// Process stdout, locked for every write
#[derive(Debug, Clone, Default)]
pub struct StdoutStream {
    _private: (),
}

impl StdoutStream {
    /// Create a handle to process stdout
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputStream for StdoutStream {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(buf)
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Shared in-memory output buffer
#[derive(Debug, Default)]
pub struct BufferStream {
    buffer: Mutex<Vec<u8>>,
}

impl BufferStream {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Drain the buffer
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Buffer contents as text, replacing invalid UTF-8
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl OutputStream for BufferStream {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(())
    }
}

/// Handles the registry forwards to plugins.
///
/// Every plugin that declares a capability receives a clone of the same
/// `Arc`; nothing here adds synchronization beyond what each handle does
/// itself.
#[derive(Debug, Clone)]
pub struct Collaborators {
    log_sink: Arc<dyn LogSink>,
    config_reader: Arc<dyn ConfigReader>,
    config_writer: Arc<dyn ConfigWriter>,
    stdout: Arc<dyn OutputStream>,
}

impl Collaborators {
    /// Start building a collaborator set
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::default()
    }

    /// Logger for `plugin`, namespaced `Plugin.<name>`
    pub fn logger_for(&self, plugin: &str) -> PluginLogger {
        PluginLogger::new(Arc::clone(&self.log_sink), format!("Plugin.{plugin}"))
    }

    /// Shared configuration reader
    pub fn config_reader(&self) -> Arc<dyn ConfigReader> {
        Arc::clone(&self.config_reader)
    }

    /// Shared configuration writer
    pub fn config_writer(&self) -> Arc<dyn ConfigWriter> {
        Arc::clone(&self.config_writer)
    }

    /// Shared output stream
    pub fn stdout(&self) -> Arc<dyn OutputStream> {
        Arc::clone(&self.stdout)
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`Collaborators`]
#[derive(Debug, Default)]
pub struct CollaboratorsBuilder {
    log_sink: Option<Arc<dyn LogSink>>,
    config: Option<(Arc<dyn ConfigReader>, Arc<dyn ConfigWriter>)>,
    stdout: Option<Arc<dyn OutputStream>>,
}

impl CollaboratorsBuilder {
    /// Sink behind every plugin logger (default: [`TracingLogSink`])
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Configuration stream for both reading and writing (default: empty [`MemoryConfig`])
    pub fn config<C>(mut self, config: Arc<C>) -> Self
    where
        C: ConfigReader + ConfigWriter + 'static,
    {
        let reader: Arc<dyn ConfigReader> = config.clone();
        let writer: Arc<dyn ConfigWriter> = config;
        self.config = Some((reader, writer));
        self
    }

    /// Shared output stream (default: [`StdoutStream`])
    pub fn stdout(mut self, stdout: Arc<dyn OutputStream>) -> Self {
        self.stdout = Some(stdout);
        self
    }

    /// Finish, filling in defaults
    pub fn build(self) -> Collaborators {
        let (config_reader, config_writer) = self.config.unwrap_or_else(|| {
            let memory = Arc::new(MemoryConfig::default());
            let reader: Arc<dyn ConfigReader> = memory.clone();
            let writer: Arc<dyn ConfigWriter> = memory;
            (reader, writer)
        });

        Collaborators {
            log_sink: self
                .log_sink
                .unwrap_or_else(|| Arc::new(TracingLogSink::new())),
            config_reader,
            config_writer,
            stdout: self.stdout.unwrap_or_else(|| Arc::new(StdoutStream::new())),
        }
    }
}
