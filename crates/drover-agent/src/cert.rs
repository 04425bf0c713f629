use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::error::AgentError;

/// PEM-encoded trust certificate for the control server connection.
///
/// Decoded once at startup so a bad file fails the process before any task
/// runs. Cloning is cheap; every session shares the same material.
#[derive(Clone)]
pub struct Certificate {
    pem: Arc<str>,
    tag: Arc<str>,
}

impl Certificate {
    /// Validate PEM text. `origin` only feeds the error message.
    pub fn from_pem(pem_text: &str, origin: &Path) -> Result<Self, AgentError> {
        let decoded = pem::parse(pem_text).map_err(|e| AgentError::Certificate {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pem: Arc::from(pem_text),
            tag: Arc::from(decoded.tag()),
        })
    }

    pub fn as_pem(&self) -> &str {
        &self.pem
    }

    /// PEM block label, e.g. `CERTIFICATE`.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("tag", &self.tag)
            .field("len", &self.pem.len())
            .finish()
    }
}

/// Read and decode the certificate at `path`; `None` means no certificate.
pub fn load_certificate(path: Option<&Path>) -> Result<Option<Certificate>, AgentError> {
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path).map_err(|source| AgentError::CertificateRead {
        path: PathBuf::from(path),
        source,
    })?;
    Certificate::from_pem(&text, path).map(Some)
}
