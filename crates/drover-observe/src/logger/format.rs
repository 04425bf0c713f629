use std::str::FromStr;

use crate::logger::error::LoggerError;

/// Output encoding of the process log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per record, with the span chain attached.
    Json,
    /// Native systemd journal fields.
    Journald,
}

impl LoggerFormat {
    pub fn is_available(self) -> bool {
        match self {
            Self::Journald => cfg!(all(target_os = "linux", feature = "journald")),
            _ => true,
        }
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Self::Text,
            "json" => Self::Json,
            "journald" | "journal" => Self::Journald,
            _ => return Err(LoggerError::UnknownFormat(s.to_string())),
        };
        if !format.is_available() {
            return Err(LoggerError::JournaldUnavailable);
        }
        Ok(format)
    }
}
