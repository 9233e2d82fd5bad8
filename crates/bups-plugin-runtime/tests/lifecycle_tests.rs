//! Integration tests for registration and phase dispatch
//!
//! These drive the registry through its public API only, with plugins
//! resolved from a linked-in factory table.

use bups_plugin_api::testing::MockPlugin;
use bups_plugin_runtime::prelude::*;
use bups_plugin_runtime::{BufferStream, ConfigFile, LoadError};
use std::fs;
use std::sync::Arc;

fn backup() -> Box<dyn Plugin> {
    Box::new(
        MockPlugin::new("backup", LifecyclePhase::CycleStart)
            .with_capabilities([Capability::ArgsDelivery, Capability::ConfigRead]),
    )
}

fn upload() -> Box<dyn Plugin> {
    Box::new(
        MockPlugin::new("upload", LifecyclePhase::Callback)
            .with_capabilities([Capability::LogSink, Capability::ConfigRead]),
    )
}

fn web_config() -> Box<dyn Plugin> {
    Box::new(MockPlugin::new("web_config", LifecyclePhase::Init).with_capabilities(Capability::ALL))
}

fn broken() -> Box<dyn Plugin> {
    Box::new(MockPlugin::new("broken", LifecyclePhase::Init).with_raw_capability(99))
}

fn resolver() -> StaticResolver {
    StaticResolver::new()
        .with("backup", backup)
        .with("upload", upload)
        .with("web_config", web_config)
        .with("broken", broken)
}

#[test]
fn test_register_from_paths_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("plugins.toml");
    fs::write(&config_path, "[upload]\nretries = 3\n").unwrap();

    let stdout = Arc::new(BufferStream::new());
    let collaborators = Collaborators::builder()
        .config(Arc::new(ConfigFile::new(&config_path)))
        .stdout(stdout)
        .build();
    let registry = Arc::new(PluginRegistry::new(collaborators, Arc::new(resolver())));

    for path in ["/opt/bups/upload.so", "/opt/bups/backup.so", "/opt/bups/web_config.so"] {
        registry.register(path).unwrap();
    }

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.state(), None);

    let mut order = Vec::new();
    registry.range_all_plugins(|_, plugin| order.push(plugin.name().to_string()));
    assert_eq!(order, vec!["web_config", "backup", "upload"]);

    let mut aware = Vec::new();
    registry.range_args_plugins(|_, plugin| aware.push(plugin.name().to_string()));
    assert_eq!(aware, vec!["web_config", "backup"]);

    let mut cycle = BackupCycle::new(Arc::clone(&registry));
    cycle
        .run_once(Some(&["--database".to_string(), "shop".to_string()]))
        .unwrap();

    assert_eq!(cycle.completed_cycles(), 1);
    assert_eq!(registry.state(), Some(LifecyclePhase::Callback));
}

#[test]
fn test_bad_module_leaves_registry_usable() {
    let registry = PluginRegistry::new(Collaborators::default(), Arc::new(resolver()));

    registry.register("backup").unwrap();

    let err = registry.register("broken").unwrap_err();
    assert!(err.is_configuration());

    let err = registry.register("backup").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Configuration(ConfigurationError::DuplicatePlugin(_))
    ));

    assert_eq!(registry.len(), 1);
    registry.set_state(LifecyclePhase::CycleStart).unwrap();
    assert_eq!(registry.state(), Some(LifecyclePhase::CycleStart));
}

#[test]
fn test_dylib_resolver_rejects_missing_module() {
    let registry = PluginRegistry::default();
    let err = registry.register("/nonexistent/libbackup.so").unwrap_err();

    assert!(matches!(
        err,
        RegistryError::Configuration(ConfigurationError::Load(LoadError::NotFound(_)))
    ));
}
