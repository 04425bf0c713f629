//! Task execution seam. The agent loop treats execution as opaque: it hands
//! over the session and gets a [`TaskOutcome`] back.

use async_trait::async_trait;
use drover_model::TaskOutcome;

use crate::session::AgentSession;

mod command;
pub use command::CommandExecutor;

/// Environment variable holding the current task id for child processes.
pub const TASK_ID_ENV: &str = "DROVER_TASK_ID";
/// Environment variable holding the host id for child processes.
pub const HOST_ID_ENV: &str = "DROVER_HOST_ID";

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run the session's task to completion. Failures are reported in the
    /// outcome; they never stop the agent by themselves.
    async fn execute(&self, session: &AgentSession) -> TaskOutcome;
}

/// Reports success without doing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExecutor;

#[async_trait]
impl TaskExecutor for NoopExecutor {
    async fn execute(&self, session: &AgentSession) -> TaskOutcome {
        tracing::debug!(task_id = %session.task().id, "noop task");
        TaskOutcome::succeeded()
    }
}
