use std::{path::PathBuf, sync::Arc};

use drover_observe::LogContext;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    agent::{Agent, AgentExit},
    cert::load_certificate,
    client::ControlServer,
    config::AgentConfig,
    dump,
    error::AgentError,
    exec::TaskExecutor,
    pidfile::PidFile,
    session::{AgentSession, HostIdentity, TaskIdentity},
    status::{self, StatusApi},
};

/// Raw startup inputs, as given on the command line.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub api_server: String,
    pub task: TaskIdentity,
    pub host: HostIdentity,
    pub https_cert: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
}

impl AgentOptions {
    /// Decode the certificate and validate the initial session.
    ///
    /// Nothing here touches the network.
    pub fn into_session(self) -> Result<AgentSession, AgentError> {
        let certificate = load_certificate(self.https_cert.as_deref())?;
        AgentSession::new(
            &self.api_server,
            self.task,
            self.host,
            certificate,
            self.pid_file,
        )
    }
}

/// Run the agent process around `session`: diagnostics listener, pid
/// marker, state dump handler and the execution loop.
///
/// Setup failures come back as `Err` before any task is claimed. Once the
/// loop starts, the outcome is in the returned [`AgentExit`].
pub async fn run_process(
    session: AgentSession,
    control: Arc<dyn ControlServer>,
    executor: Arc<dyn TaskExecutor>,
    config: &AgentConfig,
    log: LogContext,
) -> Result<AgentExit, AgentError> {
    let listener = status::bind(config.status_addr).await?;
    let pid = session
        .pid_file()
        .map(|path| PidFile::create(path))
        .transpose()?;

    let agent = Agent::new(session, control, executor, log.child("loop"));
    let cancel = CancellationToken::new();
    let dump_task = dump::spawn(agent.subscribe(), cancel.clone())?;
    let status_task = tokio::spawn(status::serve(
        listener,
        StatusApi::new(agent.subscribe()).router(),
        cancel.clone(),
    ));

    let exit = agent.run().await;
    info!(code = exit.code, tasks_run = exit.tasks_run, "agent loop finished");

    cancel.cancel();
    match status_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "status server stopped with error"),
        Err(e) => warn!(error = %e, "status server task failed"),
    }
    let _ = dump_task.await;
    if let Some(pid) = pid {
        pid.release();
    }
    Ok(exit)
}
