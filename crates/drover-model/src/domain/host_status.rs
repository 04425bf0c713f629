use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Lifecycle status of a host as recorded in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostStatus {
    /// Instance requested from the provider, not yet usable.
    Provisioning,
    /// Instance is up and its control channel answered the last probe.
    Running,
    /// Instance is up according to the provider but the last probe failed.
    Unreachable,
    /// Instance is gone. Terminal.
    Terminated,
}

impl HostStatus {
    /// Returns `true` for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HostStatus::Terminated)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Transitions only move towards `Terminated`, except for
    /// `Running <-> Unreachable` which may oscillate.
    pub fn can_transition_to(&self, next: HostStatus) -> bool {
        use HostStatus::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Provisioning, Provisioning) => true,
            (Provisioning, Running | Unreachable) => true,
            (Running | Unreachable, Running | Unreachable) => true,
            (Running | Unreachable, Provisioning) => false,
        }
    }
}

impl FromStr for HostStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "provisioning" => Ok(HostStatus::Provisioning),
            "running" => Ok(HostStatus::Running),
            "unreachable" => Ok(HostStatus::Unreachable),
            "terminated" => Ok(HostStatus::Terminated),
            _ => Err(ModelError::InvalidHostStatus(s.to_string())),
        }
    }
}
