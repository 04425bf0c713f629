use std::time::SystemTime;

use crate::{Host, HostStatus};

/// Predicate over host records, evaluated by a host registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostQuery {
    /// Live hosts not checked after the threshold (`last_monitored <= threshold`).
    NotMonitoredSince(SystemTime),
    /// Hosts that are running and have no task assigned.
    AvailableAndFree,
}

impl HostQuery {
    pub fn not_monitored_since(threshold: SystemTime) -> Self {
        HostQuery::NotMonitoredSince(threshold)
    }

    pub fn available_and_free() -> Self {
        HostQuery::AvailableAndFree
    }

    /// Evaluate the predicate against a single record.
    ///
    /// Terminated hosts never match a staleness query: there is nothing
    /// left to reconcile for them.
    pub fn matches(&self, host: &Host) -> bool {
        match self {
            HostQuery::NotMonitoredSince(threshold) => {
                host.status != HostStatus::Terminated && host.last_monitored <= *threshold
            }
            HostQuery::AvailableAndFree => host.is_available(),
        }
    }
}
