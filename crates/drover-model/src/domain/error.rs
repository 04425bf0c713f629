use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid host status: '{0}' (valid: provisioning, running, unreachable, terminated)")]
    InvalidHostStatus(String),
}
