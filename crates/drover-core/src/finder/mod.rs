//! Discovery of hosts eligible for new work.
//!
//! [`HostFinder`] is the seam the scheduler depends on. The production
//! implementation is a thin, uncached view over the registry; the static
//! one gives schedulers a deterministic fleet in tests.

use std::sync::Arc;

use async_trait::async_trait;
use drover_model::{Host, HostQuery};
use tracing::trace;

use crate::{error::RegistryError, registry::HostRegistry};

/// Finds hosts that are ready to run a new task.
#[async_trait]
pub trait HostFinder: Send + Sync {
    /// Hosts that are running and have no task assigned.
    async fn find_available_hosts(&self) -> Result<Vec<Host>, RegistryError>;
}

/// [`HostFinder`] backed by a [`HostRegistry`] query.
///
/// Registry errors are returned unchanged; nothing is cached or retried.
pub struct RegistryHostFinder {
    registry: Arc<dyn HostRegistry>,
}

impl RegistryHostFinder {
    pub fn new(registry: Arc<dyn HostRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl HostFinder for RegistryHostFinder {
    async fn find_available_hosts(&self) -> Result<Vec<Host>, RegistryError> {
        let hosts = self
            .registry
            .find(&HostQuery::available_and_free())
            .await?;
        trace!(count = hosts.len(), "available hosts found");
        Ok(hosts)
    }
}

/// In-memory [`HostFinder`] over a fixed host list.
///
/// Still applies the availability predicate, so a busy or unreachable host
/// in the list is never handed out.
#[derive(Debug, Clone, Default)]
pub struct StaticHostFinder {
    hosts: Vec<Host>,
}

impl StaticHostFinder {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }
}

#[async_trait]
impl HostFinder for StaticHostFinder {
    async fn find_available_hosts(&self) -> Result<Vec<Host>, RegistryError> {
        Ok(self
            .hosts
            .iter()
            .filter(|h| h.is_available())
            .cloned()
            .collect())
    }
}
