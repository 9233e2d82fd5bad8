//! Lifecycle phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a plugin runs relative to a backup cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum LifecyclePhase {
    /// Runs once before any backup cycle
    Init = 0,

    /// Runs at the start of every backup invocation
    CycleStart = 1,

    /// Runs after every backup invocation completes
    Callback = 2,
}

impl LifecyclePhase {
    /// Every phase, in the order the host visits them
    pub const ALL: [LifecyclePhase; 3] = [
        LifecyclePhase::Init,
        LifecyclePhase::CycleStart,
        LifecyclePhase::Callback,
    ];

    /// The raw tag used across the module boundary
    pub fn tag(self) -> PhaseTag {
        PhaseTag(self as u32)
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            LifecyclePhase::Init => "init",
            LifecyclePhase::CycleStart => "cycle_start",
            LifecyclePhase::Callback => "callback",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw phase tag as declared by a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseTag(pub u32);

impl From<LifecyclePhase> for PhaseTag {
    fn from(phase: LifecyclePhase) -> Self {
        phase.tag()
    }
}

impl TryFrom<PhaseTag> for LifecyclePhase {
    type Error = PhaseTag;

    fn try_from(tag: PhaseTag) -> Result<Self, Self::Error> {
        match tag.0 {
            0 => Ok(LifecyclePhase::Init),
            1 => Ok(LifecyclePhase::CycleStart),
            2 => Ok(LifecyclePhase::Callback),
            _ => Err(tag),
        }
    }
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match LifecyclePhase::try_from(*self) {
            Ok(phase) => write!(f, "{phase}"),
            Err(_) => write!(f, "#{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_tags() {
        for phase in LifecyclePhase::ALL {
            assert_eq!(LifecyclePhase::try_from(phase.tag()), Ok(phase));
        }
        assert_eq!(LifecyclePhase::try_from(PhaseTag(3)), Err(PhaseTag(3)));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(LifecyclePhase::CycleStart.to_string(), "cycle_start");
        assert_eq!(PhaseTag(9).to_string(), "#9");
        assert_eq!(PhaseTag(2).to_string(), "callback");
    }
}
