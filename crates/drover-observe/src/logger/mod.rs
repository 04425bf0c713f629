mod config;
mod error;
mod format;
mod log;

pub use config::{LOG_ENV, LogTarget, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Install the global subscriber. Call once, at process start.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}
