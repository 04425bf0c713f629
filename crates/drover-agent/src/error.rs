use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("error reading certificate file {path}: {source}")]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not decode certificate file ({path}): {reason}")]
    Certificate { path: PathBuf, reason: String },

    #[error("error creating pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("malformed control server response: {0}")]
    MalformedResponse(String),

    #[error("received nil response from control server")]
    EmptyResponse,

    #[error("control server request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("control server returned {status}: {body}")]
    ControlServer { status: u16, body: String },

    #[error("status server failed: {0}")]
    StatusServer(#[source] io::Error),

    #[error("signal handler failed: {0}")]
    Signal(#[source] io::Error),
}
