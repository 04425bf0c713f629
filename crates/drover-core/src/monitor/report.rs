use drover_model::HostId;

use crate::error::HostCheckError;

/// What one reconciliation did to one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCheck {
    /// Provider says running; probe result recorded.
    Reachability { reachable: bool, changed: bool },
    /// Provider says the instance is gone; host marked terminated.
    Terminated,
    /// Provider reported some other state; only the timestamp was refreshed.
    Skipped(String),
}

/// Summary of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Hosts selected as stale.
    pub checked: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub terminated: usize,
    pub skipped: usize,
    /// Hosts whose reachability flipped during this sweep.
    pub transitions: Vec<HostId>,
    /// Per-host failures; the sweep went on past each of them.
    pub errors: Vec<HostCheckError>,
}

impl SweepReport {
    pub(crate) fn record(&mut self, id: HostId, result: Result<HostCheck, HostCheckError>) {
        match result {
            Ok(HostCheck::Reachability { reachable, changed }) => {
                if reachable {
                    self.reachable += 1;
                } else {
                    self.unreachable += 1;
                }
                if changed {
                    self.transitions.push(id);
                }
            }
            Ok(HostCheck::Terminated) => self.terminated += 1,
            Ok(HostCheck::Skipped(_)) => self.skipped += 1,
            Err(e) => self.errors.push(e),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
