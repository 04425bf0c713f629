//! Diagnostics HTTP listener.
//!
//! Read-only: it renders the latest [`AgentSnapshot`] and never reaches into
//! the execution loop. A panicking handler answers 500 instead of taking the
//! process down.

use std::{
    net::SocketAddr,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use drover_core::{HostInfo, process_uptime};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::watch};
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::info;

use crate::{
    agent::{AgentPhase, AgentSnapshot},
    error::AgentError,
};

/// Diagnostics service builder.
pub struct StatusApi {
    state: watch::Receiver<AgentSnapshot>,
}

impl StatusApi {
    pub fn new(state: watch::Receiver<AgentSnapshot>) -> Self {
        Self { state }
    }

    /// Build the router.
    ///
    /// Routes:
    /// - GET /status - Agent state
    /// - GET /healthz - Liveness
    pub fn router(self) -> Router {
        harden(
            Router::new()
                .route("/status", get(status))
                .route("/healthz", get(healthz))
                .with_state(self.state),
        )
    }
}

fn harden(router: Router) -> Router {
    router.layer(CatchPanicLayer::new())
}

/// Bind the listener. Kept apart from [`serve`] so a taken port fails
/// startup instead of surfacing later.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, AgentError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(AgentError::StatusServer)?;
    info!(addr = %listener.local_addr().map_err(AgentError::StatusServer)?, "status server listening");
    Ok(listener)
}

/// Serve until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    cancel: CancellationToken,
) -> Result<(), AgentError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(AgentError::StatusServer)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub pid: u32,
    pub host_id: String,
    pub task_id: String,
    pub api_server: String,
    pub phase: AgentPhase,
    pub tasks_run: u64,
    pub started_at: u64,
    pub uptime_seconds: u64,
    pub last_error: Option<String>,
    pub hostname: String,
    pub platform: String,
    pub arch: String,
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &AgentSnapshot) -> Self {
        let host = HostInfo::collect();
        Self {
            pid: std::process::id(),
            host_id: snapshot.session.host().id.to_string(),
            task_id: snapshot.session.task().id.to_string(),
            api_server: snapshot.session.api_url().to_string(),
            phase: snapshot.phase,
            tasks_run: snapshot.tasks_run,
            started_at: snapshot
                .started_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            uptime_seconds: process_uptime().as_secs(),
            last_error: snapshot.last_error.clone(),
            hostname: host.hostname,
            platform: host.os.to_string(),
            arch: host.arch.to_string(),
        }
    }
}

/// GET /status
async fn status(State(state): State<watch::Receiver<AgentSnapshot>>) -> impl IntoResponse {
    let response = StatusResponse::from_snapshot(&state.borrow());
    Json(response)
}

/// GET /healthz
async fn healthz() -> &'static str {
    "ok"
}

/// Seconds since `at`, clamped at zero.
pub(crate) fn seconds_since(at: SystemTime) -> u64 {
    SystemTime::now()
        .duration_since(at)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::session::{AgentSession, HostIdentity, TaskIdentity};

    fn snapshot() -> AgentSnapshot {
        let session = AgentSession::new(
            "https://control.example.com",
            TaskIdentity::new("t9", "super-secret-task"),
            HostIdentity::new("h4", "super-secret-host"),
            None,
            None,
        )
        .unwrap();
        AgentSnapshot {
            session: Arc::new(session),
            phase: AgentPhase::Executing,
            tasks_run: 3,
            started_at: SystemTime::now(),
            last_error: None,
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn status_renders_snapshot_without_secrets() {
        let (_tx, rx) = watch::channel(snapshot());
        let (code, body) = get(StatusApi::new(rx).router(), "/status").await;

        assert_eq!(code, StatusCode::OK);
        assert!(!body.contains("super-secret"));

        let parsed: StatusResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.host_id, "h4");
        assert_eq!(parsed.task_id, "t9");
        assert_eq!(parsed.phase, AgentPhase::Executing);
        assert_eq!(parsed.tasks_run, 3);
        assert_eq!(parsed.pid, std::process::id());
    }

    #[tokio::test]
    async fn status_follows_latest_snapshot() {
        let (tx, rx) = watch::channel(snapshot());
        tx.send_modify(|s| {
            s.phase = AgentPhase::Failed;
            s.last_error = Some("control server returned 500: boom".into());
        });

        let (_, body) = get(StatusApi::new(rx).router(), "/status").await;
        let parsed: StatusResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.phase, AgentPhase::Failed);
        assert_eq!(parsed.last_error.as_deref(), Some("control server returned 500: boom"));
    }

    #[tokio::test]
    async fn healthz_answers() {
        let (_tx, rx) = watch::channel(snapshot());
        let (code, body) = get(StatusApi::new(rx).router(), "/healthz").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        async fn explode() -> &'static str {
            panic!("diagnostics handler bug")
        }
        let router = harden(Router::new().route("/explode", axum::routing::get(explode)));

        let (code, _) = get(router.clone(), "/explode").await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        // The service keeps answering after a panic.
        let (code, _) = get(router, "/explode").await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn serves_until_cancelled() {
        let (_tx, rx) = watch::channel(snapshot());
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, StatusApi::new(rx).router(), cancel.clone()));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn seconds_since_future_is_zero() {
        let later = SystemTime::now() + std::time::Duration::from_secs(60);
        assert_eq!(seconds_since(later), 0);
    }
}
