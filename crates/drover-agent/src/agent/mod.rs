//! The agent's execution loop.
//!
//! Strictly one task at a time: claim the current task, execute it, report
//! the outcome and learn whether to continue. Continuing means building a
//! fresh [`AgentSession`] for the next task; the loop never runs two
//! sessions at once and never retries a failed exchange. The first error
//! ends the process with [`exit_code::FAILURE`].

use std::{sync::Arc, time::SystemTime};

use drover_model::EndTaskResponse;
use drover_observe::LogContext;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{Instrument, error, info, info_span};

use crate::{
    client::ControlServer, error::AgentError, exec::TaskExecutor, exit_code,
    session::AgentSession,
};

/// Where the loop is right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Starting,
    Claiming,
    Executing,
    Reporting,
    Done,
    Failed,
}

impl AgentPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Read-only view of the loop, published for the diagnostics surface and
/// the state dump.
#[derive(Debug, Clone)]
pub struct AgentSnapshot {
    pub session: Arc<AgentSession>,
    pub phase: AgentPhase,
    pub tasks_run: u64,
    pub started_at: SystemTime,
    pub last_error: Option<String>,
}

/// How the loop ended.
#[derive(Debug)]
pub struct AgentExit {
    pub code: i32,
    pub tasks_run: u64,
    pub error: Option<AgentError>,
}

impl AgentExit {
    pub fn is_success(&self) -> bool {
        self.code == exit_code::OK
    }
}

pub struct Agent {
    control: Arc<dyn ControlServer>,
    executor: Arc<dyn TaskExecutor>,
    state: watch::Sender<AgentSnapshot>,
    log: LogContext,
}

impl Agent {
    pub fn new(
        session: AgentSession,
        control: Arc<dyn ControlServer>,
        executor: Arc<dyn TaskExecutor>,
        log: LogContext,
    ) -> Self {
        let (state, _) = watch::channel(AgentSnapshot {
            session: Arc::new(session),
            phase: AgentPhase::Starting,
            tasks_run: 0,
            started_at: SystemTime::now(),
            last_error: None,
        });
        Self {
            control,
            executor,
            state,
            log,
        }
    }

    /// Observe the loop without touching it.
    pub fn subscribe(&self) -> watch::Receiver<AgentSnapshot> {
        self.state.subscribe()
    }

    /// Run tasks until the control server says stop or something fails.
    pub async fn run(self) -> AgentExit {
        let span = info_span!(parent: self.log.span(), "agent_loop");
        self.run_loop().instrument(span).await
    }

    async fn run_loop(&self) -> AgentExit {
        let mut session = self.state.borrow().session.clone();
        let mut tasks_run = 0u64;

        loop {
            let task_span = info_span!("task", task_id = %session.task().id);
            let step = self.run_task(&session, &mut tasks_run).instrument(task_span).await;

            match step {
                Ok(next) => match next {
                    Some(next) => {
                        info!(
                            previous = %session.task().id,
                            next = %next.task().id,
                            "continuing to next task"
                        );
                        session = Arc::new(next);
                        self.state.send_modify(|s| s.session = session.clone());
                    }
                    None => {
                        info!(tasks_run, "no more tasks to run");
                        return self.finish(AgentPhase::Done, tasks_run, None);
                    }
                },
                Err(e) => {
                    error!(error = %e, tasks_run, "agent loop failed");
                    return self.finish(AgentPhase::Failed, tasks_run, Some(e));
                }
            }
        }
    }

    /// One full exchange for `session`. Returns the next session, if any.
    async fn run_task(
        &self,
        session: &AgentSession,
        tasks_run: &mut u64,
    ) -> Result<Option<AgentSession>, AgentError> {
        self.set_phase(AgentPhase::Claiming);
        self.control.start_task(session).await?;

        self.set_phase(AgentPhase::Executing);
        info!("running task");
        let outcome = self.executor.execute(session).await;
        *tasks_run += 1;
        self.state.send_modify(|s| s.tasks_run = *tasks_run);
        info!(success = outcome.is_success(), message = ?outcome.message, "task finished");

        self.set_phase(AgentPhase::Reporting);
        let response = self
            .control
            .end_task(session, &outcome)
            .await?
            .ok_or(AgentError::EmptyResponse)?;
        next_session(session, &response)
    }

    fn set_phase(&self, phase: AgentPhase) {
        self.state.send_modify(|s| s.phase = phase);
    }

    fn finish(&self, phase: AgentPhase, tasks_run: u64, error: Option<AgentError>) -> AgentExit {
        let last_error = error.as_ref().map(ToString::to_string);
        self.state.send_modify(|s| {
            s.phase = phase;
            s.tasks_run = tasks_run;
            s.last_error = last_error;
        });
        let code = match phase {
            AgentPhase::Done => exit_code::OK,
            _ => exit_code::FAILURE,
        };
        AgentExit {
            code,
            tasks_run,
            error,
        }
    }
}

fn next_session(
    session: &AgentSession,
    response: &EndTaskResponse,
) -> Result<Option<AgentSession>, AgentError> {
    if let Some(message) = &response.message {
        info!(%message, "control server message");
    }
    if !response.run_next {
        return Ok(None);
    }
    session.next(response).map(Some)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use drover_model::TaskOutcome;

    use super::*;
    use crate::session::{HostIdentity, TaskIdentity};

    /// What the scripted server answers to `end_task`.
    enum Reply {
        Stop,
        Next(&'static str, &'static str),
        Nil,
        Raw(EndTaskResponse),
        Fail,
    }

    #[derive(Default)]
    struct ScriptedControl {
        replies: Mutex<VecDeque<Reply>>,
        fail_start: Mutex<Vec<&'static str>>,
        calls: Mutex<Vec<String>>,
        secrets: Mutex<HashMap<String, String>>,
    }

    impl ScriptedControl {
        fn with(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ControlServer for ScriptedControl {
        async fn start_task(&self, session: &AgentSession) -> Result<(), AgentError> {
            let id = session.task().id.to_string();
            self.calls.lock().unwrap().push(format!("start {id}"));
            self.secrets
                .lock()
                .unwrap()
                .insert(id.clone(), session.task().secret.expose().to_string());
            if self.fail_start.lock().unwrap().iter().any(|f| *f == id) {
                return Err(AgentError::ControlServer {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(())
        }

        async fn end_task(
            &self,
            session: &AgentSession,
            outcome: &TaskOutcome,
        ) -> Result<Option<EndTaskResponse>, AgentError> {
            self.calls.lock().unwrap().push(format!(
                "end {} {}",
                session.task().id,
                if outcome.is_success() { "ok" } else { "failed" }
            ));
            let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Stop);
            match reply {
                Reply::Stop => Ok(Some(EndTaskResponse::stop())),
                Reply::Next(id, secret) => Ok(Some(EndTaskResponse::next(id, secret))),
                Reply::Nil => Ok(None),
                Reply::Raw(r) => Ok(Some(r)),
                Reply::Fail => Err(AgentError::ControlServer {
                    status: 500,
                    body: "boom".into(),
                }),
            }
        }
    }

    /// Counts executions and the highest number running at once.
    #[derive(Default)]
    struct CountingExecutor {
        running: AtomicUsize,
        max_running: AtomicUsize,
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TaskExecutor for CountingExecutor {
        async fn execute(&self, _session: &AgentSession) -> TaskOutcome {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                TaskOutcome::failed("exit code: 1")
            } else {
                TaskOutcome::succeeded()
            }
        }
    }

    fn session() -> AgentSession {
        AgentSession::new(
            "https://control.example.com",
            TaskIdentity::new("t1", "ts1"),
            HostIdentity::new("h1", "hs1"),
            None,
            None,
        )
        .unwrap()
    }

    fn agent(control: Arc<ScriptedControl>, executor: Arc<CountingExecutor>) -> Agent {
        Agent::new(session(), control, executor, LogContext::disabled())
    }

    #[tokio::test]
    async fn stops_after_one_task_when_told_not_to_continue() {
        let control = ScriptedControl::with([Reply::Stop]);
        let executor = Arc::new(CountingExecutor::default());

        let exit = agent(control.clone(), executor.clone()).run().await;

        assert_eq!(exit.code, exit_code::OK);
        assert!(exit.is_success());
        assert_eq!(exit.tasks_run, 1);
        assert_eq!(executor.runs.load(Ordering::SeqCst), 1);
        assert_eq!(control.calls(), vec!["start t1", "end t1 ok"]);
    }

    #[tokio::test]
    async fn chains_tasks_with_fresh_identity() {
        let control = ScriptedControl::with([
            Reply::Next("t2", "ts2"),
            Reply::Next("t3", "ts3"),
            Reply::Stop,
        ]);
        let executor = Arc::new(CountingExecutor::default());

        let agent = agent(control.clone(), executor.clone());
        let state = agent.subscribe();
        let exit = agent.run().await;

        assert_eq!(exit.code, exit_code::OK);
        assert_eq!(exit.tasks_run, 3);
        assert_eq!(
            control.calls(),
            vec![
                "start t1", "end t1 ok", "start t2", "end t2 ok", "start t3", "end t3 ok"
            ]
        );

        let secrets = control.secrets.lock().unwrap().clone();
        assert_eq!(secrets["t1"], "ts1");
        assert_eq!(secrets["t2"], "ts2");
        assert_eq!(secrets["t3"], "ts3");

        let snapshot = state.borrow().clone();
        assert_eq!(snapshot.phase, AgentPhase::Done);
        assert_eq!(snapshot.tasks_run, 3);
        assert_eq!(snapshot.session.task().id.as_str(), "t3");
        assert_eq!(snapshot.session.host().id.as_str(), "h1");
    }

    #[tokio::test]
    async fn never_runs_two_tasks_at_once() {
        let control = ScriptedControl::with((2..=8).map(|_| Reply::Next("tn", "tsn")));
        let executor = Arc::new(CountingExecutor::default());

        let exit = agent(control, executor.clone()).run().await;

        assert_eq!(exit.tasks_run, 8);
        assert_eq!(executor.max_running.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn task_failure_is_reported_not_fatal() {
        let control = ScriptedControl::with([Reply::Stop]);
        let executor = Arc::new(CountingExecutor {
            fail: true,
            ..Default::default()
        });

        let exit = agent(control.clone(), executor).run().await;

        assert_eq!(exit.code, exit_code::OK);
        assert_eq!(control.calls(), vec!["start t1", "end t1 failed"]);
    }

    #[tokio::test]
    async fn transport_failure_on_first_exchange_exits_before_running() {
        let control = ScriptedControl::with([Reply::Stop]);
        control.fail_start.lock().unwrap().push("t1");
        let executor = Arc::new(CountingExecutor::default());

        let agent = agent(control.clone(), executor.clone());
        let state = agent.subscribe();
        let exit = agent.run().await;

        assert_eq!(exit.code, exit_code::FAILURE);
        assert_eq!(exit.tasks_run, 0);
        assert_eq!(executor.runs.load(Ordering::SeqCst), 0);
        assert!(matches!(exit.error, Some(AgentError::ControlServer { status: 503, .. })));

        let snapshot = state.borrow().clone();
        assert_eq!(snapshot.phase, AgentPhase::Failed);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn failed_report_exits_without_retry() {
        let control = ScriptedControl::with([Reply::Next("t2", "ts2"), Reply::Fail]);
        let executor = Arc::new(CountingExecutor::default());

        let exit = agent(control.clone(), executor).run().await;

        assert_eq!(exit.code, exit_code::FAILURE);
        assert_eq!(exit.tasks_run, 2);
        assert_eq!(
            control.calls(),
            vec!["start t1", "end t1 ok", "start t2", "end t2 ok"]
        );
    }

    #[tokio::test]
    async fn empty_response_is_failure() {
        let control = ScriptedControl::with([Reply::Nil]);
        let exit = agent(control, Arc::new(CountingExecutor::default())).run().await;

        assert_eq!(exit.code, exit_code::FAILURE);
        assert!(matches!(exit.error, Some(AgentError::EmptyResponse)));
    }

    #[tokio::test]
    async fn incomplete_next_task_is_failure() {
        let mut missing_id = EndTaskResponse::next("x", "ts2");
        missing_id.task_id = None;
        let control = ScriptedControl::with([Reply::Raw(missing_id)]);

        let exit = agent(control.clone(), Arc::new(CountingExecutor::default()))
            .run()
            .await;

        assert_eq!(exit.code, exit_code::FAILURE);
        assert!(matches!(exit.error, Some(AgentError::MalformedResponse(_))));
        // No exchange was attempted for the broken identity.
        assert_eq!(control.calls(), vec!["start t1", "end t1 ok"]);
    }

    #[test]
    fn finished_phases() {
        assert!(AgentPhase::Done.is_finished());
        assert!(AgentPhase::Failed.is_finished());
        assert!(!AgentPhase::Executing.is_finished());
    }
}
