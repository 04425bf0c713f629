use drover_model::HostId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("host not found: {0}")]
    NotFound(HostId),

    #[error("registry query failed: {0}")]
    Query(String),

    #[error("registry write failed for host {host_id}: {reason}")]
    Write { host_id: HostId, reason: String },
}

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("no cloud provider registered for '{0}'")]
    UnknownProvider(String),

    #[error("cloud provider request failed: {0}")]
    Request(String),
}

/// Failure of one step while reconciling a single host.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("error getting cloud host: {0}")]
    Adapter(#[source] CloudError),

    #[error("error getting cloud status: {0}")]
    Status(#[source] CloudError),

    #[error("error checking reachability: {0}")]
    Reachability(#[source] CloudError),

    #[error("{op} timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    #[error("error updating registry: {0}")]
    Registry(#[from] RegistryError),
}

/// A per-host reconciliation failure, tagged with the host it belongs to.
#[derive(Debug, Error)]
#[error("error checking reachability for host {host_id}: {source}")]
pub struct HostCheckError {
    pub host_id: HostId,
    #[source]
    pub source: CheckError,
}

/// Failure of a whole sweep.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("error finding hosts not monitored recently: {0}")]
    Query(#[source] RegistryError),
}
