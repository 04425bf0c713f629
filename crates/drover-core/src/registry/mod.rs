mod memory;
pub use memory::MemoryHostRegistry;

use std::time::SystemTime;

use async_trait::async_trait;
use drover_model::{Host, HostId, HostQuery};

use crate::error::RegistryError;

/// Persisted store of host records.
///
/// Every write refreshes the host's `last_monitored` timestamp to `now`.
/// A host that is already `Terminated` keeps that status whatever is written.
#[async_trait]
pub trait HostRegistry: Send + Sync + 'static {
    /// All hosts matching the predicate, in unspecified order.
    async fn find(&self, query: &HostQuery) -> Result<Vec<Host>, RegistryError>;

    /// Record a reachability probe result: `Running` when reachable,
    /// `Unreachable` otherwise.
    async fn update_reachability(
        &self,
        id: &HostId,
        reachable: bool,
        now: SystemTime,
    ) -> Result<(), RegistryError>;

    /// Mark the host `Terminated`.
    async fn set_terminated(&self, id: &HostId, now: SystemTime) -> Result<(), RegistryError>;

    /// Refresh `last_monitored` without touching the status.
    async fn touch(&self, id: &HostId, now: SystemTime) -> Result<(), RegistryError>;
}
