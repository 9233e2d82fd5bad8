//! Plugin registry and lifecycle dispatcher

use crate::collaborators::Collaborators;
use crate::error::{ConfigurationError, RegistryError, Result};
use crate::loader::{DylibResolver, ModuleResolver};
use bups_plugin_api::{Capability, CapabilityTag, LifecyclePhase, Plugin};
use libloading::Library;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Plugin registry and lifecycle dispatcher.
///
/// Owns every registered plugin, injects the collaborators each one asks
/// for, and runs plugins phase by phase. One exclusive lock serializes
/// [`register`](Self::register), [`set_state`](Self::set_state),
/// [`relay_args`](Self::relay_args) and both `range_*` visitors.
///
/// # Deadlocks
///
/// A visitor passed to a `range_*` method and a plugin's `start` both run
/// while the lock is held. Calling back into the registry from either one
/// deadlocks.
pub struct PluginRegistry {
    inner: Mutex<Inner>,

    /// Last phase that completed, see [`state`](Self::state)
    state: AtomicU8,

    collaborators: Collaborators,
    resolver: Arc<dyn ModuleResolver>,
}

#[derive(Default)]
struct Inner {
    init: Vec<Entry>,
    cycle_start: Vec<Entry>,
    callback: Vec<Entry>,

    /// Decoded capabilities by plugin name
    capabilities: HashMap<String, Vec<Capability>>,
}

struct Entry {
    instance: Instance,
    name: String,
    phase: LifecyclePhase,
    accepts_args: bool,
}

/// A plugin and the library its code lives in.
///
/// Field order matters: the plugin is dropped before its library is unmapped.
struct Instance {
    plugin: Box<dyn Plugin>,
    _library: Option<Library>,
}

/// Registered plugin as reported by [`PluginRegistry::describe`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Plugin name
    pub name: String,

    /// Phase the plugin runs in
    pub phase: LifecyclePhase,

    /// Capabilities injected at registration
    pub capabilities: Vec<Capability>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &"<opaque>")
            .field("state", &self.state())
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl Inner {
    fn sequence(&self, phase: LifecyclePhase) -> &[Entry] {
        match phase {
            LifecyclePhase::Init => &self.init,
            LifecyclePhase::CycleStart => &self.cycle_start,
            LifecyclePhase::Callback => &self.callback,
        }
    }

    fn sequence_mut(&mut self, phase: LifecyclePhase) -> &mut Vec<Entry> {
        match phase {
            LifecyclePhase::Init => &mut self.init,
            LifecyclePhase::CycleStart => &mut self.cycle_start,
            LifecyclePhase::Callback => &mut self.callback,
        }
    }

    /// Every entry: Init, then CycleStart, then Callback, each in registration order
    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.init
            .iter()
            .chain(self.cycle_start.iter())
            .chain(self.callback.iter())
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.init
            .iter_mut()
            .chain(self.cycle_start.iter_mut())
            .chain(self.callback.iter_mut())
    }
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new(collaborators: Collaborators, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            state: AtomicU8::new(encode_state(None)),
            collaborators,
            resolver,
        }
    }

    /// Collaborators handed to plugins
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Load the module at `path` and register the plugin it produces.
    ///
    /// The module's factory is invoked once. Its capability and phase tags
    /// are validated before anything is injected, so a failed registration
    /// leaves the registry exactly as it was.
    pub fn register(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut inner = self.inner.lock();

        let module = self
            .resolver
            .resolve(path)
            .map_err(ConfigurationError::from)?;
        let (factory, library) = module.into_parts();

        let instance = Instance {
            plugin: factory(),
            _library: library,
        };

        debug!(path = %path.display(), plugin = %instance.plugin.name(), "Plugin module resolved");

        self.classify(&mut inner, instance)
    }

    /// Register an already constructed plugin
    pub fn register_plugin(&self, plugin: Box<dyn Plugin>) -> Result<()> {
        let mut inner = self.inner.lock();
        self.classify(
            &mut inner,
            Instance {
                plugin,
                _library: None,
            },
        )
    }

    fn classify(&self, inner: &mut Inner, mut instance: Instance) -> Result<()> {
        let name = instance.plugin.name().to_string();

        if inner.capabilities.contains_key(&name) {
            return Err(ConfigurationError::duplicate(&name).into());
        }

        let capabilities = decode_capabilities(&name, instance.plugin.capabilities())?;
        let phase = LifecyclePhase::try_from(instance.plugin.phase()).map_err(|tag| {
            ConfigurationError::UnsupportedPhase {
                plugin: name.clone(),
                tag: tag.0,
            }
        })?;

        for capability in &capabilities {
            self.inject(instance.plugin.as_mut(), &name, *capability);
        }

        let accepts_args = capabilities.contains(&Capability::ArgsDelivery);
        inner.capabilities.insert(name.clone(), capabilities);
        inner.sequence_mut(phase).push(Entry {
            instance,
            name: name.clone(),
            phase,
            accepts_args,
        });

        info!(plugin = %name, phase = %phase, "Plugin registered");

        Ok(())
    }

    fn inject(&self, plugin: &mut dyn Plugin, name: &str, capability: Capability) {
        match capability {
            Capability::ArgsDelivery => {}
            Capability::LogSink => plugin.set_logger(self.collaborators.logger_for(name)),
            Capability::ConfigRead => plugin.set_config_reader(self.collaborators.config_reader()),
            Capability::ConfigWrite => plugin.set_config_writer(self.collaborators.config_writer()),
            Capability::SharedStdout => plugin.set_stdout(self.collaborators.stdout()),
        }
    }

    /// Run every plugin of `phase` with no arguments
    pub fn set_state(&self, phase: LifecyclePhase) -> Result<()> {
        self.set_state_with_args(phase, None)
    }

    /// Run every plugin of `phase`, in registration order.
    ///
    /// `args`, when present, go to the plugins that declared
    /// [`Capability::ArgsDelivery`]; the rest receive `None`. The first
    /// failing plugin stops the phase and its error is returned. The phase
    /// marker only moves once every plugin has returned `Ok`.
    pub fn set_state_with_args(&self, phase: LifecyclePhase, args: Option<&[String]>) -> Result<()> {
        let mut inner = self.inner.lock();
        let sequence = inner.sequence_mut(phase);

        debug!(phase = %phase, plugins = sequence.len(), "Running phase");

        for entry in sequence.iter_mut() {
            let relayed = if entry.accepts_args { args } else { None };

            if let Err(source) = entry.instance.plugin.start(relayed) {
                error!(plugin = %entry.name, phase = %phase, error = %source, "Plugin failed");
                return Err(RegistryError::Module {
                    plugin: entry.name.clone(),
                    phase,
                    source,
                });
            }
        }

        self.state.store(encode_state(Some(phase)), Ordering::Relaxed);
        info!(phase = %phase, "Phase complete");

        Ok(())
    }

    /// Last phase that ran to completion, `None` before the first one.
    ///
    /// This is a relaxed read that does not take the registry lock. A
    /// concurrent [`set_state`](Self::set_state) may not be visible yet.
    /// Phase transitions are expected to come from one controlling thread.
    pub fn state(&self) -> Option<LifecyclePhase> {
        decode_state(self.state.load(Ordering::Relaxed))
    }

    /// Start one argument-aware plugin with a relayed command line
    pub fn relay_args(&self, name: &str, args: &[String]) -> Result<()> {
        let mut inner = self.inner.lock();

        let entry = inner
            .entries_mut()
            .find(|entry| entry.name == name)
            .ok_or_else(|| RegistryError::not_found(name))?;

        if !entry.accepts_args {
            return Err(RegistryError::NotArgsAware(name.to_string()));
        }

        debug!(plugin = %name, args = args.len(), "Relaying arguments");

        entry
            .instance
            .plugin
            .start(Some(args))
            .map_err(|source| RegistryError::Module {
                plugin: name.to_string(),
                phase: entry.phase,
                source,
            })
    }

    /// Visit every plugin that declared [`Capability::ArgsDelivery`].
    ///
    /// Plugins are visited by phase (Init, CycleStart, Callback), then in
    /// registration order within a phase. This is not overall registration
    /// order: a Callback plugin registered first is visited after an Init
    /// plugin registered later.
    pub fn range_args_plugins<F>(&self, mut visitor: F)
    where
        F: FnMut(usize, &dyn Plugin),
    {
        let inner = self.inner.lock();
        for (index, entry) in inner.entries().filter(|e| e.accepts_args).enumerate() {
            visitor(index, entry.instance.plugin.as_ref());
        }
    }

    /// Visit every plugin: Init, then CycleStart, then Callback
    pub fn range_all_plugins<F>(&self, mut visitor: F)
    where
        F: FnMut(usize, &dyn Plugin),
    {
        let inner = self.inner.lock();
        for (index, entry) in inner.entries().enumerate() {
            visitor(index, entry.instance.plugin.as_ref());
        }
    }

    /// Capabilities injected into `name`
    pub fn capabilities(&self, name: &str) -> Option<Vec<Capability>> {
        self.inner.lock().capabilities.get(name).cloned()
    }

    /// Names of the plugins in `phase`, in registration order
    pub fn phase_plugins(&self, phase: LifecyclePhase) -> Vec<String> {
        self.inner
            .lock()
            .sequence(phase)
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Summaries of every plugin, in the same order as [`range_all_plugins`](Self::range_all_plugins)
    pub fn describe(&self) -> Vec<PluginSummary> {
        let inner = self.inner.lock();
        inner
            .entries()
            .map(|entry| PluginSummary {
                name: entry.name.clone(),
                phase: entry.phase,
                capabilities: inner
                    .capabilities
                    .get(&entry.name)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.inner.lock().capabilities.len()
    }

    /// Whether no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(Collaborators::default(), Arc::new(DylibResolver::new()))
    }
}

/// Decode raw tags, keeping first-declaration order and dropping repeats
fn decode_capabilities(
    plugin: &str,
    tags: Vec<CapabilityTag>,
) -> std::result::Result<Vec<Capability>, ConfigurationError> {
    let mut capabilities = Vec::with_capacity(tags.len());

    for tag in tags {
        let capability =
            Capability::try_from(tag).map_err(|tag| ConfigurationError::UnsupportedCapability {
                plugin: plugin.to_string(),
                tag: tag.0,
            })?;

        if !capabilities.contains(&capability) {
            capabilities.push(capability);
        }
    }

    Ok(capabilities)
}

fn encode_state(phase: Option<LifecyclePhase>) -> u8 {
    match phase {
        None => 0,
        Some(LifecyclePhase::Init) => 1,
        Some(LifecyclePhase::CycleStart) => 2,
        Some(LifecyclePhase::Callback) => 3,
    }
}

fn decode_state(raw: u8) -> Option<LifecyclePhase> {
    match raw {
        1 => Some(LifecyclePhase::Init),
        2 => Some(LifecyclePhase::CycleStart),
        3 => Some(LifecyclePhase::Callback),
        _ => None,
    }
}
