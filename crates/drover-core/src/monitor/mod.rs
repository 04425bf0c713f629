//! Host reachability monitor.
//!
//! A sweep selects every live host not checked within the configured
//! interval and reconciles each one against its cloud provider:
//!
//! - provider reports **running**: probe the control channel and record the
//!   result (`Running` / `Unreachable`), logging only actual flips;
//! - provider reports **terminated**: mark the host terminated;
//! - anything else: leave the status alone.
//!
//! Every host gets its `last_monitored` refreshed to the sweep time, and a
//! failure on one host never stops the sweep: per-host errors are collected
//! into the [`SweepReport`]. There are no retries inside a sweep; a host is
//! simply selected again once it is stale.

mod config;
pub use config::{MonitorConfig, REACHABILITY_CHECK_INTERVAL};

mod report;
pub use report::{HostCheck, SweepReport};

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use drover_model::{CloudStatus, Host, HostQuery, HostStatus};
use drover_observe::LogContext;
use futures::{StreamExt, stream};
use tokio::time::{MissedTickBehavior, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    cloud::CloudProvider,
    error::{CheckError, CloudError, HostCheckError, MonitorError},
    registry::HostRegistry,
};

pub struct ReachabilityMonitor {
    registry: Arc<dyn HostRegistry>,
    cloud: Arc<dyn CloudProvider>,
    config: MonitorConfig,
    log: LogContext,
}

impl ReachabilityMonitor {
    pub fn new(
        registry: Arc<dyn HostRegistry>,
        cloud: Arc<dyn CloudProvider>,
        config: MonitorConfig,
        log: LogContext,
    ) -> Self {
        Self {
            registry,
            cloud,
            config,
            log,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run one sweep as of `now`.
    ///
    /// Only the staleness query can fail the sweep as a whole.
    pub async fn reconcile(&self, now: SystemTime) -> Result<SweepReport, MonitorError> {
        let span = info_span!(parent: self.log.span(), "sweep");
        self.sweep(now).instrument(span).await
    }

    async fn sweep(&self, now: SystemTime) -> Result<SweepReport, MonitorError> {
        info!("running reachability checks");

        let threshold = now.checked_sub(self.config.interval).unwrap_or(UNIX_EPOCH);
        let hosts = self
            .registry
            .find(&HostQuery::not_monitored_since(threshold))
            .await
            .map_err(MonitorError::Query)?;

        let mut report = SweepReport {
            checked: hosts.len(),
            ..Default::default()
        };

        let mut results = stream::iter(hosts)
            .map(|host| async move {
                let result = self.check_host(&host, now).await;
                (host, result)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some((host, result)) = results.next().await {
            let result = match result {
                Ok(check) => Ok(check),
                Err(source) => {
                    warn!(host_id = %host.id, error = %source, "reachability check failed");
                    self.touch_after_failure(&host, now).await;
                    Err(HostCheckError {
                        host_id: host.id.clone(),
                        source,
                    })
                }
            };
            report.record(host.id, result);
        }

        info!(
            checked = report.checked,
            reachable = report.reachable,
            unreachable = report.unreachable,
            terminated = report.terminated,
            skipped = report.skipped,
            errors = report.errors.len(),
            "finished running host reachability checks"
        );
        Ok(report)
    }

    /// Reconcile a single host.
    async fn check_host(&self, host: &Host, now: SystemTime) -> Result<HostCheck, CheckError> {
        debug!(host_id = %host.id, provider = %host.provider, "running reachability check");

        let cloud = self.cloud.cloud_host(host).map_err(CheckError::Adapter)?;
        let status = self
            .bounded("instance status", cloud.instance_status())
            .await?
            .map_err(CheckError::Status)?;

        match status {
            CloudStatus::Running => {
                let reachable = self
                    .bounded("reachability probe", cloud.is_reachable())
                    .await?
                    .map_err(CheckError::Reachability)?;

                let was_unreachable = host.status == HostStatus::Unreachable;
                let changed = was_unreachable == reachable;
                if changed && reachable {
                    info!(host_id = %host.id, "setting host as reachable");
                } else if changed {
                    info!(host_id = %host.id, previous = ?host.status, "setting host as unreachable");
                }

                self.registry
                    .update_reachability(&host.id, reachable, now)
                    .await?;
                Ok(HostCheck::Reachability { reachable, changed })
            }
            CloudStatus::Terminated => {
                info!(host_id = %host.id, "host terminated externally; marking terminated");
                self.registry.set_terminated(&host.id, now).await?;
                Ok(HostCheck::Terminated)
            }
            CloudStatus::Other(raw) => {
                debug!(host_id = %host.id, cloud_status = %raw, "no action for cloud status");
                self.registry.touch(&host.id, now).await?;
                Ok(HostCheck::Skipped(raw))
            }
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<Result<T, CloudError>, CheckError>
    where
        F: Future<Output = Result<T, CloudError>>,
    {
        let limit = self.config.probe_timeout;
        timeout(limit, fut).await.map_err(|_| CheckError::Timeout {
            op,
            timeout_ms: duration_ms(limit),
        })
    }

    /// Keep the staleness bound for hosts that failed this sweep.
    async fn touch_after_failure(&self, host: &Host, now: SystemTime) {
        if let Err(e) = self.registry.touch(&host.id, now).await {
            debug!(host_id = %host.id, error = %e, "could not refresh monitored timestamp");
        }
    }

    /// Sweep on a fixed cadence until cancelled.
    ///
    /// The next tick is awaited only once the current sweep has returned,
    /// so sweeps never overlap; a slow sweep delays the following one.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            parent: self.log.span(),
            interval_ms = duration_ms(self.config.interval),
            concurrency = self.config.concurrency,
            "reachability monitor started"
        );
        loop {
            // The tick is polled only between sweeps, so sweeps never overlap.
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.reconcile(SystemTime::now()).await {
                Ok(report) => {
                    for e in &report.errors {
                        warn!(parent: self.log.span(), host_id = %e.host_id, error = %e.source, "host left unreconciled this sweep");
                    }
                }
                Err(e) => warn!(parent: self.log.span(), error = %e, "reachability sweep failed"),
            }
        }
        info!(parent: self.log.span(), "reachability monitor stopped");
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
