//! # bups Plugin API
//!
//! This crate provides the SDK for writing bups plugins.
//!
//! A plugin is a module that belongs to one lifecycle phase and asks the host
//! for a set of capabilities:
//!
//! - **Argument delivery**: receive command-line arguments relayed by the host
//! - **Log sink**: a logger namespaced with the plugin name
//! - **Config read / write**: the shared configuration stream
//! - **Shared stdout**: the host's shared output stream
//!
//! ## Example
//!
//! ```rust,no_run
//! use bups_plugin_api::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Hello {
//!     logger: Option<PluginLogger>,
//! }
//!
//! impl Plugin for Hello {
//!     fn name(&self) -> &str { "hello" }
//!     fn phase(&self) -> PhaseTag { LifecyclePhase::Callback.into() }
//!     fn capabilities(&self) -> Vec<CapabilityTag> { vec![Capability::LogSink.into()] }
//!
//!     fn start(&mut self, _args: Option<&[String]>) -> Result<(), PluginError> {
//!         if let Some(logger) = &self.logger {
//!             logger.info("backup finished");
//!         }
//!         Ok(())
//!     }
//!
//!     fn set_logger(&mut self, logger: PluginLogger) {
//!         self.logger = Some(logger);
//!     }
//! }
//!
//! bups_plugin_api::declare_plugin!(Hello::default);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod capability;
pub mod collaborator;
pub mod error;
pub mod phase;
pub mod plugin;

#[cfg(feature = "testing")]
pub mod testing;

pub use capability::{Capability, CapabilityTag};
pub use collaborator::{ConfigReader, ConfigWriter, LogSink, OutputStream, PluginLogger};
pub use error::PluginError;
pub use phase::{LifecyclePhase, PhaseTag};
pub use plugin::{Plugin, PluginDeclaration, PluginFactory, DECLARATION_SYMBOL, PLUGIN_API_VERSION};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::capability::{Capability, CapabilityTag};
    pub use crate::collaborator::{ConfigReader, ConfigWriter, LogSink, OutputStream, PluginLogger};
    pub use crate::error::PluginError;
    pub use crate::phase::{LifecyclePhase, PhaseTag};
    pub use crate::plugin::Plugin;
}
