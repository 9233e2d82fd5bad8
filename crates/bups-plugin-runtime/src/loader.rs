//! Module resolvers
//!
//! A resolver turns a module path into a [`PluginFactory`]. The registry does
//! not care whether the factory comes from a shared library or was linked in.

use crate::error::LoadError;
use bups_plugin_api::{PluginDeclaration, PluginFactory, DECLARATION_SYMBOL, PLUGIN_API_VERSION};
use libloading::{Library, Symbol};
use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Resolves a module path to a plugin factory
pub trait ModuleResolver: Send + Sync + fmt::Debug {
    /// Resolve `path`
    fn resolve(&self, path: &Path) -> Result<ResolvedModule, LoadError>;
}

/// A factory together with whatever keeps its code alive
pub struct ResolvedModule {
    factory: PluginFactory,
    library: Option<Library>,
}

impl fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

impl ResolvedModule {
    /// A factory compiled into the host
    pub fn linked(factory: PluginFactory) -> Self {
        Self {
            factory,
            library: None,
        }
    }

    /// Whether the factory lives in a shared library
    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }

    pub(crate) fn into_parts(self) -> (PluginFactory, Option<Library>) {
        (self.factory, self.library)
    }
}

/// Loads plugins from shared libraries.
///
/// The library must export a [`PluginDeclaration`] under
/// [`DECLARATION_SYMBOL`], which `declare_plugin!` does, built against a
/// plugin API compatible with the host's.
///
/// The version check covers the plugin API crate only. `Box<dyn Plugin>` has
/// no stable ABI, so a library must also be built with the same rustc and
/// the same `bups-plugin-api` source as the host. A library that passes the
/// check but was built with another compiler is undefined behavior.
#[derive(Debug, Clone, Default)]
pub struct DylibResolver {
    _private: (),
}

impl DylibResolver {
    /// Create a new shared library resolver
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleResolver for DylibResolver {
    #[allow(unsafe_code)]
    fn resolve(&self, path: &Path) -> Result<ResolvedModule, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        // SAFETY: running a library's initializers is inherent to plugin
        // loading; the operator chooses which paths are configured.
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: `declare_plugin!` exports the symbol as a
        // `PluginDeclaration` static. It is copied out while `library` is
        // still loaded, and `library` travels with the factory afterwards.
        let declaration: PluginDeclaration = unsafe {
            let symbol: Symbol<'_, *const PluginDeclaration> =
                library
                    .get(DECLARATION_SYMBOL)
                    .map_err(|source| LoadError::MissingSymbol {
                        path: path.to_path_buf(),
                        symbol: "bups_plugin_declaration",
                        source,
                    })?;
            **symbol
        };

        if !api_compatible(declaration.api_version) {
            return Err(LoadError::IncompatibleApi {
                path: path.to_path_buf(),
                found: declaration.api_version.to_string(),
                expected: PLUGIN_API_VERSION.to_string(),
            });
        }

        debug!(
            path = %path.display(),
            api_version = declaration.api_version,
            "Plugin library loaded"
        );

        Ok(ResolvedModule {
            factory: declaration.create,
            library: Some(library),
        })
    }
}

/// Whether a module built against `found` can run in this host
fn api_compatible(found: &str) -> bool {
    let (Ok(host), Ok(found)) = (Version::parse(PLUGIN_API_VERSION), Version::parse(found)) else {
        return false;
    };

    let requirement = VersionReq {
        comparators: vec![Comparator {
            op: Op::Caret,
            major: host.major,
            minor: Some(host.minor),
            patch: None,
            pre: Prerelease::EMPTY,
        }],
    };

    requirement.matches(&found)
}

/// Table of plugin factories compiled into the host.
///
/// Lookup is by the exact path string first, then by the file stem, so both
/// `cycle-report` and `plugins/cycle-report.so` resolve to a factory
/// registered as `cycle-report`.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    factories: HashMap<String, PluginFactory>,
}

impl StaticResolver {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `key`
    pub fn with(mut self, key: impl Into<String>, factory: PluginFactory) -> Self {
        self.insert(key, factory);
        self
    }

    /// Register `factory` under `key`, replacing any previous entry
    pub fn insert(&mut self, key: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(key.into(), factory);
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl ModuleResolver for StaticResolver {
    fn resolve(&self, path: &Path) -> Result<ResolvedModule, LoadError> {
        let key = path.to_string_lossy();

        let factory = self.factories.get(key.as_ref()).or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| self.factories.get(stem))
        });

        factory
            .copied()
            .map(ResolvedModule::linked)
            .ok_or_else(|| LoadError::UnknownModule(key.into_owned()))
    }
}
