//! Capabilities a plugin can request from the host

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cross-cutting service a plugin may request.
///
/// The set is closed. Every place that hands out collaborators matches on it
/// exhaustively, so a new variant has to be wired everywhere before the
/// workspace compiles again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum Capability {
    /// Receive command-line arguments relayed by the host
    ArgsDelivery = 0,

    /// Receive a logger namespaced with the plugin name
    LogSink = 1,

    /// Receive a handle to read the shared configuration stream
    ConfigRead = 2,

    /// Receive a handle to write the shared configuration stream
    ConfigWrite = 3,

    /// Receive the host's shared output stream
    SharedStdout = 4,
}

impl Capability {
    /// Every capability, in tag order
    pub const ALL: [Capability; 5] = [
        Capability::ArgsDelivery,
        Capability::LogSink,
        Capability::ConfigRead,
        Capability::ConfigWrite,
        Capability::SharedStdout,
    ];

    /// The raw tag used across the module boundary
    pub fn tag(self) -> CapabilityTag {
        CapabilityTag(self as u32)
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ArgsDelivery => "args_delivery",
            Capability::LogSink => "log_sink",
            Capability::ConfigRead => "config_read",
            Capability::ConfigWrite => "config_write",
            Capability::SharedStdout => "shared_stdout",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw capability tag as declared by a plugin.
///
/// Plugins are compiled separately from the host, so what they declare is an
/// integer until the registry decodes it. Tags outside [`Capability::ALL`]
/// are rejected at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTag(pub u32);

impl From<Capability> for CapabilityTag {
    fn from(capability: Capability) -> Self {
        capability.tag()
    }
}

impl TryFrom<CapabilityTag> for Capability {
    type Error = CapabilityTag;

    fn try_from(tag: CapabilityTag) -> Result<Self, Self::Error> {
        Capability::ALL
            .into_iter()
            .find(|capability| *capability as u32 == tag.0)
            .ok_or(tag)
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Capability::try_from(*self) {
            Ok(capability) => write!(f, "{capability}"),
            Err(_) => write!(f, "#{}", self.0),
        }
    }
}
