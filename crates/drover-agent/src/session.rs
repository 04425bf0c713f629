use std::path::{Path, PathBuf};

use drover_model::{EndTaskResponse, HostId, Secret, TaskId};
use reqwest::Url;

use crate::{cert::Certificate, error::AgentError};

/// The task the agent is currently authorized to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentity {
    pub id: TaskId,
    pub secret: Secret,
}

impl TaskIdentity {
    pub fn new(id: impl Into<TaskId>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: Secret::new(secret),
        }
    }
}

/// The host the agent runs on. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub id: HostId,
    pub secret: Secret,
}

impl HostIdentity {
    pub fn new(id: impl Into<HostId>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: Secret::new(secret),
        }
    }
}

/// Everything one loop iteration needs to talk to the control server.
///
/// Immutable once built. Chaining to the next task produces a new session
/// through [`AgentSession::next`]; the previous one is dropped whole.
#[derive(Debug, Clone)]
pub struct AgentSession {
    api_url: Url,
    task: TaskIdentity,
    host: HostIdentity,
    certificate: Option<Certificate>,
    pid_file: Option<PathBuf>,
}

impl AgentSession {
    pub fn new(
        api_url: &str,
        task: TaskIdentity,
        host: HostIdentity,
        certificate: Option<Certificate>,
        pid_file: Option<PathBuf>,
    ) -> Result<Self, AgentError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| AgentError::InvalidSession(format!("api server url {api_url:?}: {e}")))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(AgentError::InvalidSession(format!(
                "api server url must be http(s), got {}",
                api_url.scheme()
            )));
        }
        validate_task(&task)?;
        if host.id.is_blank() {
            return Err(AgentError::InvalidSession("host id is empty".into()));
        }
        if host.secret.is_blank() {
            return Err(AgentError::InvalidSession("host secret is empty".into()));
        }
        Ok(Self {
            api_url,
            task,
            host,
            certificate,
            pid_file,
        })
    }

    /// Session for the task named in `response`.
    ///
    /// Host identity, endpoint, certificate and pid marker carry over
    /// unchanged; only the task identity is replaced.
    pub fn next(&self, response: &EndTaskResponse) -> Result<Self, AgentError> {
        let task = TaskIdentity {
            id: response.task_id.clone().unwrap_or_default(),
            secret: response.task_secret.clone().unwrap_or_default(),
        };
        validate_task(&task).map_err(|e| match e {
            AgentError::InvalidSession(msg) => AgentError::MalformedResponse(msg),
            other => other,
        })?;
        Ok(Self {
            task,
            ..self.clone()
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn task(&self) -> &TaskIdentity {
        &self.task
    }

    pub fn host(&self) -> &HostIdentity {
        &self.host
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn pid_file(&self) -> Option<&Path> {
        self.pid_file.as_deref()
    }
}

fn validate_task(task: &TaskIdentity) -> Result<(), AgentError> {
    if task.id.is_blank() {
        return Err(AgentError::InvalidSession("task id is empty".into()));
    }
    if task.secret.is_blank() {
        return Err(AgentError::InvalidSession("task secret is empty".into()));
    }
    Ok(())
}
