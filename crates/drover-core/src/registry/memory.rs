use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
    time::SystemTime,
};

use async_trait::async_trait;
use drover_model::{Host, HostId, HostQuery, HostStatus, TaskId};
use tracing::trace;

use crate::{error::RegistryError, registry::HostRegistry};

/// In-memory host registry.
///
/// Backs tests and single-process fleets. Query and write failures can be
/// injected to exercise error paths of the components built on top of it.
#[derive(Clone, Default)]
pub struct MemoryHostRegistry {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    hosts: HashMap<HostId, Host>,
    fail_queries: Option<String>,
    fail_writes: HashSet<HostId>,
}

impl MemoryHostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the given hosts.
    pub fn with_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        let registry = Self::new();
        for host in hosts {
            registry.insert(host);
        }
        registry
    }

    /// Insert or replace a host record.
    pub fn insert(&self, host: Host) {
        let mut inner = self.write();
        inner.hosts.insert(host.id.clone(), host);
    }

    pub fn get(&self, id: &HostId) -> Option<Host> {
        self.read().hosts.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().hosts.is_empty()
    }

    /// Assign a task to a host (scheduler side).
    pub fn assign_task(&self, id: &HostId, task: TaskId) -> Result<(), RegistryError> {
        let mut inner = self.write();
        let host = inner
            .hosts
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        host.running_task = Some(task);
        Ok(())
    }

    /// Clear the task assignment of a host (scheduler side).
    pub fn release_task(&self, id: &HostId) -> Result<Option<TaskId>, RegistryError> {
        let mut inner = self.write();
        let host = inner
            .hosts
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        Ok(host.running_task.take())
    }

    /// Make every subsequent `find` fail with the given reason; `None` clears it.
    pub fn fail_queries(&self, reason: Option<&str>) {
        self.write().fail_queries = reason.map(str::to_string);
    }

    /// Make every subsequent write for this host fail.
    pub fn fail_writes_for(&self, id: &HostId) {
        self.write().fail_writes.insert(id.clone());
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<F>(&self, id: &HostId, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut Host),
    {
        let mut inner = self.write();
        if inner.fail_writes.contains(id) {
            return Err(RegistryError::Write {
                host_id: id.clone(),
                reason: "injected write failure".to_string(),
            });
        }
        let host = inner
            .hosts
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        f(host);
        Ok(())
    }
}

fn transition(host: &mut Host, next: HostStatus) {
    if host.status.can_transition_to(next) {
        host.status = next;
    } else {
        trace!(host_id = %host.id, from = ?host.status, to = ?next, "status transition ignored");
    }
}

#[async_trait]
impl HostRegistry for MemoryHostRegistry {
    async fn find(&self, query: &HostQuery) -> Result<Vec<Host>, RegistryError> {
        let inner = self.read();
        if let Some(reason) = &inner.fail_queries {
            return Err(RegistryError::Query(reason.clone()));
        }
        Ok(inner
            .hosts
            .values()
            .filter(|host| query.matches(host))
            .cloned()
            .collect())
    }

    async fn update_reachability(
        &self,
        id: &HostId,
        reachable: bool,
        now: SystemTime,
    ) -> Result<(), RegistryError> {
        let next = if reachable {
            HostStatus::Running
        } else {
            HostStatus::Unreachable
        };
        self.mutate(id, |host| {
            transition(host, next);
            host.last_monitored = now;
        })
    }

    async fn set_terminated(&self, id: &HostId, now: SystemTime) -> Result<(), RegistryError> {
        self.mutate(id, |host| {
            transition(host, HostStatus::Terminated);
            host.last_monitored = now;
        })
    }

    async fn touch(&self, id: &HostId, now: SystemTime) -> Result<(), RegistryError> {
        self.mutate(id, |host| host.last_monitored = now)
    }
}
