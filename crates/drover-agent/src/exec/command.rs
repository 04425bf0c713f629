use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use drover_model::TaskOutcome;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, info, trace};

use super::{HOST_ID_ENV, TASK_ID_ENV, TaskExecutor};
use crate::session::AgentSession;

/// Runs every task as a child process.
///
/// The task identity reaches the child through [`TASK_ID_ENV`] and
/// [`HOST_ID_ENV`]. Secrets are never passed down. Stdout lines are
/// forwarded to the log; stderr is inherited.
#[derive(Clone, Debug)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    async fn execute(&self, session: &AgentSession) -> TaskOutcome {
        let task_id = session.task().id.as_str();
        trace!(target: "drover.exec", program = %self.program, args = ?self.args, task_id, "spawn");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(TASK_ID_ENV, task_id)
            .env(HOST_ID_ENV, session.host().id.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return TaskOutcome::failed(format!("spawn: {e}")),
        };

        let forward = child.stdout.take().map(|stdout| {
            let task_id = task_id.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(target: "drover.exec.out", task_id = %task_id, "{line}");
                }
            })
        });

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => return TaskOutcome::failed(format!("wait: {e}")),
        };
        if let Some(forward) = forward {
            let _ = forward.await;
        }

        if status.success() {
            debug!(target: "drover.exec", task_id, "exit success");
            return TaskOutcome::succeeded();
        }
        match status.code() {
            Some(code) => TaskOutcome::failed(format!("exit code: {code}")),
            None => TaskOutcome::failed("terminated by signal"),
        }
    }
}
