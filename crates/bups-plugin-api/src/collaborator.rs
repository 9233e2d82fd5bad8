//! Collaborator handles the host injects into plugins
//!
//! Every handle is a trait object owned by the host. A plugin loaded from a
//! shared library calls through the vtable back into host code, so log
//! records and writes end up in the host's subscriber and streams rather than
//! in a private copy linked into the plugin.

use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::Level;

/// Destination for plugin log records
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Emit one record
    fn log(&self, level: Level, namespace: &str, message: &str);
}

/// Logger handed to plugins that declared [`Capability::LogSink`].
///
/// Cloning is cheap; every clone shares the same sink.
///
/// [`Capability::LogSink`]: crate::Capability::LogSink
#[derive(Clone, Debug)]
pub struct PluginLogger {
    sink: Arc<dyn LogSink>,
    namespace: String,
}

impl PluginLogger {
    /// Create a logger writing to `sink` under `namespace`
    pub fn new(sink: Arc<dyn LogSink>, namespace: impl Into<String>) -> Self {
        Self {
            sink,
            namespace: namespace.into(),
        }
    }

    /// Namespace prefix attached to every record
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Emit a record at `level`
    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        self.sink.log(level, &self.namespace, message.as_ref());
    }

    /// Emit a trace record
    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(Level::TRACE, message);
    }

    /// Emit a debug record
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG, message);
    }

    /// Emit an info record
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::INFO, message);
    }

    /// Emit a warning record
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::WARN, message);
    }

    /// Emit an error record
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::ERROR, message);
    }
}

/// Read side of the shared configuration stream
pub trait ConfigReader: Send + Sync + fmt::Debug {
    /// Read the full configuration contents
    fn read_config(&self) -> io::Result<Vec<u8>>;

    /// Read the configuration as UTF-8
    fn read_config_string(&self) -> io::Result<String> {
        String::from_utf8(self.read_config()?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Write side of the shared configuration stream
pub trait ConfigWriter: Send + Sync + fmt::Debug {
    /// Replace the configuration contents
    fn write_config(&self, contents: &[u8]) -> io::Result<()>;
}

/// The host's shared output stream.
///
/// Writes take `&self`; implementations serialize concurrent writers
/// themselves.
pub trait OutputStream: Send + Sync + fmt::Debug {
    /// Write the whole buffer
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Write `line` followed by a newline
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.write_all(&buf)
    }
}
