use std::fmt;

use serde::{Deserialize, Serialize};

/// Instance state as reported by a cloud provider.
///
/// Only `Running` and `Terminated` drive reconciliation policy; every other
/// provider state is carried verbatim in `Other` for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloudStatus {
    Running,
    Terminated,
    Other(String),
}

impl fmt::Display for CloudStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudStatus::Running => f.write_str("running"),
            CloudStatus::Terminated => f.write_str("terminated"),
            CloudStatus::Other(raw) => write!(f, "other({raw})"),
        }
    }
}
