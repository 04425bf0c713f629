use std::io::IsTerminal;

use crate::logger::format::LoggerFormat;

/// Environment variable that overrides [`LoggerConfig::level`] when set.
pub const LOG_ENV: &str = "DROVER_LOG";

/// Stream log records are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Filter directive, e.g. `info` or `drover_core=debug,info`.
    pub level: String,
    /// Let [`LOG_ENV`] replace `level`.
    pub env_override: bool,
    pub target: LogTarget,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            env_override: true,
            target: LogTarget::Stderr,
            with_targets: true,
            use_color: std::io::stderr().is_terminal(),
        }
    }
}

impl LoggerConfig {
    /// Directive actually applied, given the value of [`LOG_ENV`].
    pub fn effective_level(&self, env: Option<&str>) -> String {
        match env.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) if self.env_override => v.to_string(),
            _ => self.level.clone(),
        }
    }
}
