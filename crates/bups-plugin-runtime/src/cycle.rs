//! Backup cycle driver

use crate::error::Result;
use crate::registry::PluginRegistry;
use bups_plugin_api::LifecyclePhase;
use std::sync::Arc;
use tracing::info;

/// Drives a registry through its phases.
///
/// `Init` runs once, on the first cycle or an explicit
/// [`initialize`](Self::initialize). Each cycle then runs `CycleStart`
/// followed by `Callback`. A failing `CycleStart` skips that cycle's
/// `Callback`.
#[derive(Debug)]
pub struct BackupCycle {
    registry: Arc<PluginRegistry>,
    initialized: bool,
    cycles: u64,
}

impl BackupCycle {
    /// Create a driver for `registry`
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            initialized: false,
            cycles: 0,
        }
    }

    /// Registry being driven
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Run the `Init` phase unless it already succeeded
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.registry.set_state(LifecyclePhase::Init)?;
        self.initialized = true;

        Ok(())
    }

    /// Whether `Init` has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run one backup cycle, relaying `args` to argument-aware `CycleStart` plugins
    pub fn run_once(&mut self, args: Option<&[String]>) -> Result<()> {
        self.initialize()?;

        let cycle = self.cycles + 1;
        info!(cycle, "Backup cycle starting");

        self.registry
            .set_state_with_args(LifecyclePhase::CycleStart, args)?;
        self.registry.set_state(LifecyclePhase::Callback)?;

        self.cycles = cycle;
        info!(cycle, "Backup cycle complete");

        Ok(())
    }

    /// Run `count` cycles, stopping at the first failure
    pub fn run(&mut self, count: u64, args: Option<&[String]>) -> Result<()> {
        for _ in 0..count {
            self.run_once(args)?;
        }
        Ok(())
    }

    /// Number of cycles that ran to completion
    pub fn completed_cycles(&self) -> u64 {
        self.cycles
    }
}
