//! State dump on SIGQUIT.
//!
//! The signal never stops the process. Each delivery logs one warn-level
//! record describing the loop as last published.

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{agent::AgentSnapshot, error::AgentError, status::seconds_since};

/// Human-readable dump of `snapshot`.
pub fn render(snapshot: &AgentSnapshot) -> String {
    let session = &snapshot.session;
    let mut out = format!(
        "pid={} phase={:?} tasks_run={} running_for={}s host_id={} task_id={} api_server={}",
        std::process::id(),
        snapshot.phase,
        snapshot.tasks_run,
        seconds_since(snapshot.started_at),
        session.host().id,
        session.task().id,
        session.api_url(),
    );
    if let Some(path) = session.pid_file() {
        out.push_str(&format!(" pid_file={}", path.display()));
    }
    if let Some(err) = &snapshot.last_error {
        out.push_str(&format!(" last_error={err:?}"));
    }
    out
}

/// Install the SIGQUIT handler. Runs until `cancel` fires.
#[cfg(unix)]
pub fn spawn(
    state: watch::Receiver<AgentSnapshot>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, AgentError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut quit = signal(SignalKind::quit()).map_err(AgentError::Signal)?;
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = quit.recv() => {
                    if received.is_none() {
                        break;
                    }
                    let dump = render(&state.borrow());
                    warn!(target: "drover.dump", "{dump}");
                }
            }
        }
    }))
}

/// No SIGQUIT outside unix; the task just waits for shutdown.
#[cfg(not(unix))]
pub fn spawn(
    _state: watch::Receiver<AgentSnapshot>,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, AgentError> {
    Ok(tokio::spawn(async move { cancel.cancelled().await }))
}
