use std::time::Duration;

/// How long a host may go unchecked before a sweep picks it up.
pub const REACHABILITY_CHECK_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Staleness threshold and sweep cadence.
    pub interval: Duration,
    /// Upper bound for a single provider call (status query or probe).
    pub probe_timeout: Duration,
    /// Hosts reconciled concurrently within one sweep; `1` is sequential.
    pub concurrency: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: REACHABILITY_CHECK_INTERVAL,
            probe_timeout: Duration::from_secs(30),
            concurrency: 1,
        }
    }
}
