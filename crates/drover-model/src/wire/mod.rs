//! Messages exchanged between the agent and the control server.

mod task;
pub use task::{EndTaskRequest, EndTaskResponse, OutcomeStatus, TaskOutcome};
