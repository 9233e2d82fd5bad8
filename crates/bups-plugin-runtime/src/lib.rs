//! # bups Plugin Runtime
//!
//! Registry and lifecycle dispatcher for bups plugins.
//!
//! ## Features
//!
//! - **Plugin Registry**: loads modules, injects the capabilities they ask for
//!   and sorts them into lifecycle phases
//! - **Phase Dispatch**: runs every module of a phase in registration order
//! - **Module Resolvers**: shared libraries via `libloading`, or a table of
//!   linked-in factories
//! - **Collaborators**: host-side log sink, configuration stream and shared
//!   output stream
//!
//! ## Example
//!
//! ```rust,no_run
//! use bups_plugin_runtime::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<()> {
//! let registry = Arc::new(PluginRegistry::new(
//!     Collaborators::default(),
//!     Arc::new(DylibResolver::new()),
//! ));
//!
//! registry.register("plugins/libcycle_report.so")?;
//!
//! let mut cycle = BackupCycle::new(Arc::clone(&registry));
//! cycle.run_once(None)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod collaborators;
pub mod cycle;
pub mod error;
pub mod loader;
pub mod registry;

pub use collaborators::{
    BufferStream, Collaborators, CollaboratorsBuilder, ConfigFile, MemoryConfig, StdoutStream,
    TracingLogSink,
};
pub use cycle::BackupCycle;
pub use error::{ConfigurationError, LoadError, RegistryError, Result};
pub use loader::{DylibResolver, ModuleResolver, ResolvedModule, StaticResolver};
pub use registry::{PluginRegistry, PluginSummary};

// Re-export plugin API types for convenience
pub use bups_plugin_api::{
    Capability, CapabilityTag, LifecyclePhase, PhaseTag, Plugin, PluginError, PluginLogger,
    PLUGIN_API_VERSION,
};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::collaborators::Collaborators;
    pub use crate::cycle::BackupCycle;
    pub use crate::error::{ConfigurationError, RegistryError, Result};
    pub use crate::loader::{DylibResolver, ModuleResolver, StaticResolver};
    pub use crate::registry::PluginRegistry;
    pub use bups_plugin_api::prelude::*;
}
