use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::{HostId, HostStatus, ProviderKey, Secret, TaskId};

/// A provisioned compute resource tracked by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// Unique host identifier.
    pub id: HostId,
    /// Provider the instance belongs to; selects the cloud adapter.
    pub provider: ProviderKey,
    /// Secret the agent on this host authenticates with.
    pub secret: Secret,
    /// Recorded lifecycle status.
    pub status: HostStatus,
    /// Last time the reachability monitor looked at this host.
    #[serde(with = "crate::domain::unix_secs")]
    pub last_monitored: SystemTime,
    /// Task currently assigned by the scheduler, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_task: Option<TaskId>,
}

impl Host {
    pub fn new(
        id: impl Into<HostId>,
        provider: impl Into<ProviderKey>,
        secret: impl Into<Secret>,
        status: HostStatus,
        last_monitored: SystemTime,
    ) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            secret: secret.into(),
            status,
            last_monitored,
            running_task: None,
        }
    }

    /// Running and not assigned to any task.
    pub fn is_available(&self) -> bool {
        self.status == HostStatus::Running && self.running_task.is_none()
    }
}
