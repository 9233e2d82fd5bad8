//! Core plugin trait and the export declaration

use crate::capability::CapabilityTag;
use crate::collaborator::{ConfigReader, ConfigWriter, OutputStream, PluginLogger};
use crate::error::Result;
use crate::phase::PhaseTag;
use std::fmt;
use std::sync::Arc;

/// Version of this API crate, embedded in every exported declaration
pub const PLUGIN_API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Symbol under which a plugin library exports its [`PluginDeclaration`]
pub const DECLARATION_SYMBOL: &[u8] = b"bups_plugin_declaration\0";

/// Core plugin trait that all plugins must implement.
///
/// The host reads [`name`](Plugin::name), [`capabilities`](Plugin::capabilities)
/// and [`phase`](Plugin::phase) once at registration, then calls the setter
/// for every capability the plugin declared. Setters for capabilities the
/// plugin did not declare are never called.
pub trait Plugin: Send + fmt::Debug {
    /// Plugin name (must be unique)
    fn name(&self) -> &str;

    /// Phase the plugin runs in
    fn phase(&self) -> PhaseTag;

    /// Capabilities the plugin needs
    fn capabilities(&self) -> Vec<CapabilityTag>;

    /// Run the plugin.
    ///
    /// `args` is `None` during an ordinary phase run and carries the relayed
    /// command line when the host forwards an invocation to this plugin.
    fn start(&mut self, args: Option<&[String]>) -> Result<()>;

    /// Receive the namespaced logger
    fn set_logger(&mut self, _logger: PluginLogger) {}

    /// Receive the configuration reader
    fn set_config_reader(&mut self, _reader: Arc<dyn ConfigReader>) {}

    /// Receive the configuration writer
    fn set_config_writer(&mut self, _writer: Arc<dyn ConfigWriter>) {}

    /// Receive the shared output stream
    fn set_stdout(&mut self, _stdout: Arc<dyn OutputStream>) {}
}

/// Zero-argument factory producing one plugin instance
pub type PluginFactory = fn() -> Box<dyn Plugin>;

/// Static a plugin library exports under [`DECLARATION_SYMBOL`]
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    /// [`PLUGIN_API_VERSION`] the library was built against
    pub api_version: &'static str,

    /// Factory for the plugin instance
    pub create: PluginFactory,
}

impl fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl PluginDeclaration {
    /// Declaration for `create` built against this API version
    pub const fn new(create: PluginFactory) -> Self {
        Self {
            api_version: PLUGIN_API_VERSION,
            create,
        }
    }
}

/// Export a plugin from a `cdylib`.
///
/// Takes the path of a zero-argument constructor returning the plugin type.
///
/// ```rust,ignore
/// bups_plugin_api::declare_plugin!(MyPlugin::new);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($constructor:path) => {
        fn __bups_create_plugin() -> ::std::boxed::Box<dyn $crate::Plugin> {
            ::std::boxed::Box::new($constructor())
        }

        #[doc(hidden)]
        #[no_mangle]
        #[allow(non_upper_case_globals, unsafe_code)]
        pub static bups_plugin_declaration: $crate::PluginDeclaration =
            $crate::PluginDeclaration::new(__bups_create_plugin);
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capability, LifecyclePhase};

    #[derive(Debug, Default)]
    struct Quiet {
        runs: usize,
    }

    impl Plugin for Quiet {
        fn name(&self) -> &str {
            "quiet"
        }

        fn phase(&self) -> PhaseTag {
            LifecyclePhase::Init.into()
        }

        fn capabilities(&self) -> Vec<CapabilityTag> {
            vec![Capability::ArgsDelivery.into()]
        }

        fn start(&mut self, _args: Option<&[String]>) -> Result<()> {
            self.runs += 1;
            Ok(())
        }
    }

    fn make_quiet() -> Box<dyn Plugin> {
        Box::new(Quiet::default())
    }

    #[test]
    fn test_declaration_carries_api_version() {
        let declaration = PluginDeclaration::new(make_quiet);
        assert_eq!(declaration.api_version, PLUGIN_API_VERSION);

        let mut plugin = (declaration.create)();
        assert_eq!(plugin.name(), "quiet");
        plugin.start(None).unwrap();
    }

    #[test]
    fn test_symbol_is_nul_terminated() {
        assert_eq!(DECLARATION_SYMBOL.last(), Some(&0));
    }

    #[test]
    fn test_default_setters_are_noops() {
        #[derive(Debug)]
        struct Sink;
        impl crate::LogSink for Sink {
            fn log(&self, _: tracing::Level, _: &str, _: &str) {}
        }

        let mut plugin = Quiet::default();
        plugin.set_logger(PluginLogger::new(Arc::new(Sink), "Plugin.quiet"));
        assert_eq!(plugin.runs, 0);
    }
}
