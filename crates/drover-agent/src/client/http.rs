use std::time::Duration;

use async_trait::async_trait;
use drover_model::{EndTaskRequest, EndTaskResponse, TaskOutcome};
use reqwest::RequestBuilder;
use tracing::{debug, trace};

use super::{ControlServer, HOST_ID_HEADER, HOST_SECRET_HEADER, TASK_SECRET_HEADER};
use crate::{cert::Certificate, error::AgentError, session::AgentSession};

/// [`ControlServer`] over the REST API.
///
/// Built once per process: the trust certificate does not change when the
/// agent chains from one task to the next.
#[derive(Debug, Clone)]
pub struct HttpControlServer {
    client: reqwest::Client,
}

impl HttpControlServer {
    pub fn new(
        certificate: Option<&Certificate>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, AgentError> {
        let mut builder = reqwest::Client::builder();
        if let Some(cert) = certificate {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(
                cert.as_pem().as_bytes(),
            )?);
        }
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn task_url(session: &AgentSession, action: &str) -> String {
        format!(
            "{}/api/v1/tasks/{}/{}",
            session.api_url().as_str().trim_end_matches('/'),
            session.task().id,
            action
        )
    }

    fn authorized(&self, url: String, session: &AgentSession) -> RequestBuilder {
        self.client
            .post(url)
            .header(TASK_SECRET_HEADER, session.task().secret.expose())
            .header(HOST_ID_HEADER, session.host().id.as_str())
            .header(HOST_SECRET_HEADER, session.host().secret.expose())
    }
}

#[async_trait]
impl ControlServer for HttpControlServer {
    async fn start_task(&self, session: &AgentSession) -> Result<(), AgentError> {
        let url = Self::task_url(session, "start");
        trace!(%url, "starting task");

        let response = self.authorized(url, session).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ControlServer {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn end_task(
        &self,
        session: &AgentSession,
        outcome: &TaskOutcome,
    ) -> Result<Option<EndTaskResponse>, AgentError> {
        let url = Self::task_url(session, "end");
        let request = EndTaskRequest {
            task_id: session.task().id.clone(),
            host_id: session.host().id.clone(),
            outcome: outcome.clone(),
        };
        debug!(%url, success = outcome.is_success(), "ending task");

        let response = self.authorized(url, session).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::ControlServer {
                status: status.as_u16(),
                body,
            });
        }
        parse_end_response(&body)
    }
}

fn parse_end_response(body: &str) -> Result<Option<EndTaskResponse>, AgentError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body).map_err(|e| {
        AgentError::MalformedResponse(format!("failed to parse response: {}, body: {}", e, body))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use tokio::net::TcpListener;

    use super::*;
    use crate::session::{HostIdentity, TaskIdentity};

    #[derive(Default)]
    struct Seen {
        calls: Vec<String>,
        headers: Vec<(String, String, String)>,
        bodies: Vec<EndTaskRequest>,
    }

    type Shared = Arc<Mutex<Seen>>;

    fn record(seen: &Shared, call: String, headers: &HeaderMap) {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let mut seen = seen.lock().unwrap();
        seen.calls.push(call);
        seen.headers.push((
            get(TASK_SECRET_HEADER),
            get(HOST_ID_HEADER),
            get(HOST_SECRET_HEADER),
        ));
    }

    async fn start(
        State(seen): State<Shared>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> StatusCode {
        record(&seen, format!("start {id}"), &headers);
        if id == "forbidden" {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::OK
        }
    }

    async fn end(
        State(seen): State<Shared>,
        Path(id): Path<String>,
        headers: HeaderMap,
        Json(body): Json<EndTaskRequest>,
    ) -> (StatusCode, String) {
        record(&seen, format!("end {id}"), &headers);
        seen.lock().unwrap().bodies.push(body);
        match id.as_str() {
            "t1" => (
                StatusCode::OK,
                r#"{"runNext":true,"taskId":"t2","taskSecret":"ts2"}"#.into(),
            ),
            "t2" => (StatusCode::OK, r#"{"runNext":false}"#.into()),
            "nil" => (StatusCode::OK, "null".into()),
            "garbage" => (StatusCode::OK, "<html>".into()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
        }
    }

    async fn serve() -> (String, Shared) {
        let seen = Shared::default();
        let app = Router::new()
            .route("/api/v1/tasks/{id}/start", post(start))
            .route("/api/v1/tasks/{id}/end", post(end))
            .with_state(seen.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), seen)
    }

    fn session(api: &str, task: &str) -> AgentSession {
        AgentSession::new(
            api,
            TaskIdentity::new(task, format!("{task}-secret")),
            HostIdentity::new("h1", "hs1"),
            None,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn exchange_carries_credentials_and_parses_next() {
        let (api, seen) = serve().await;
        let control = HttpControlServer::new(None, None).unwrap();
        let s = session(&api, "t1");

        control.start_task(&s).await.unwrap();
        let response = control
            .end_task(&s, &TaskOutcome::succeeded())
            .await
            .unwrap()
            .unwrap();

        assert!(response.run_next);
        assert_eq!(response.task_id.unwrap().as_str(), "t2");
        assert_eq!(response.task_secret.unwrap().expose(), "ts2");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.calls, vec!["start t1", "end t1"]);
        for headers in &seen.headers {
            assert_eq!(
                headers,
                &("t1-secret".to_string(), "h1".to_string(), "hs1".to_string())
            );
        }
        assert_eq!(seen.bodies[0].task_id.as_str(), "t1");
        assert_eq!(seen.bodies[0].host_id.as_str(), "h1");
        assert!(seen.bodies[0].outcome.is_success());
    }

    #[tokio::test]
    async fn null_body_is_no_response() {
        let (api, _) = serve().await;
        let control = HttpControlServer::new(None, None).unwrap();
        let got = control
            .end_task(&session(&api, "nil"), &TaskOutcome::succeeded())
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let (api, _) = serve().await;
        let control = HttpControlServer::new(None, None).unwrap();
        let err = control
            .end_task(&session(&api, "garbage"), &TaskOutcome::failed("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)), "{err}");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (api, _) = serve().await;
        let control = HttpControlServer::new(None, None).unwrap();

        let err = control
            .end_task(&session(&api, "other"), &TaskOutcome::succeeded())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ControlServer { status: 500, ref body } if body == "boom"));

        let err = control
            .start_task(&session(&api, "forbidden"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ControlServer { status: 401, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let control = HttpControlServer::new(None, Some(Duration::from_secs(2))).unwrap();
        let err = control
            .start_task(&session(&format!("http://{addr}"), "t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)), "{err}");
    }

    #[test]
    fn blank_body_is_no_response() {
        assert!(parse_end_response("").unwrap().is_none());
        assert!(parse_end_response("  \n").unwrap().is_none());
        assert!(parse_end_response("null").unwrap().is_none());
    }
}
