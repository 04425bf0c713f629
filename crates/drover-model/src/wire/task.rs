use serde::{Deserialize, Serialize};

use crate::{HostId, Secret, TaskId};

/// Result state of a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// What the task execution subsystem reports back for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskOutcome {
    pub fn succeeded() -> Self {
        Self {
            status: OutcomeStatus::Succeeded,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// Body of the end-of-task exchange.
///
/// Secrets are not part of the body; they travel in request headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTaskRequest {
    pub task_id: TaskId,
    pub host_id: HostId,
    pub outcome: TaskOutcome,
}

/// Control server answer to an end-of-task exchange.
///
/// When `run_next` is set the response names the next task and the secret
/// the agent must present for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTaskResponse {
    pub run_next: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_secret: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EndTaskResponse {
    /// Response that ends the agent's run.
    pub fn stop() -> Self {
        Self {
            run_next: false,
            task_id: None,
            task_secret: None,
            message: None,
        }
    }

    /// Response that chains to another task.
    pub fn next(task_id: impl Into<TaskId>, task_secret: impl Into<Secret>) -> Self {
        Self {
            run_next: true,
            task_id: Some(task_id.into()),
            task_secret: Some(task_secret.into()),
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_minimal_stop() {
        let resp: EndTaskResponse = serde_json::from_str(r#"{"runNext":false}"#).unwrap();
        assert_eq!(resp, EndTaskResponse::stop());
    }

    #[test]
    fn response_parses_next_task() {
        let resp: EndTaskResponse =
            serde_json::from_str(r#"{"runNext":true,"taskId":"t2","taskSecret":"s2"}"#).unwrap();
        assert!(resp.run_next);
        assert_eq!(resp.task_id, Some(TaskId::from("t2")));
        assert_eq!(resp.task_secret.as_ref().map(Secret::expose), Some("s2"));
    }

    #[test]
    fn null_body_is_absent_response() {
        let resp: Option<EndTaskResponse> = serde_json::from_str("null").unwrap();
        assert!(resp.is_none());
    }

    #[test]
    fn request_body_carries_no_secret() {
        let req = EndTaskRequest {
            task_id: TaskId::from("t1"),
            host_id: HostId::from("h1"),
            outcome: TaskOutcome::failed("exit code: 2"),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""taskId":"t1""#));
        assert!(json.contains(r#""status":"failed""#));
        assert!(!json.to_lowercase().contains("secret"));
    }
}
