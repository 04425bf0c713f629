//! Control server contract used by the agent loop.

use async_trait::async_trait;
use drover_model::{EndTaskResponse, TaskOutcome};

use crate::{error::AgentError, session::AgentSession};

mod http;
pub use http::HttpControlServer;

/// Header carrying the task secret.
pub const TASK_SECRET_HEADER: &str = "Task-Secret";
/// Header carrying the host id.
pub const HOST_ID_HEADER: &str = "Host-Id";
/// Header carrying the host secret.
pub const HOST_SECRET_HEADER: &str = "Host-Secret";

/// One exchange per task: claim it, then report its outcome and learn what
/// comes next.
#[async_trait]
pub trait ControlServer: Send + Sync {
    /// Present the session's task identity before running it.
    async fn start_task(&self, session: &AgentSession) -> Result<(), AgentError>;

    /// Report the outcome of the session's task.
    ///
    /// `Ok(None)` means the server answered with an empty body.
    async fn end_task(
        &self,
        session: &AgentSession,
        outcome: &TaskOutcome,
    ) -> Result<Option<EndTaskResponse>, AgentError>;
}
