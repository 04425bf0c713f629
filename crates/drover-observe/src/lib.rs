//! Logging for drover processes.
//!
//! [`logger_init`] installs the process subscriber once at startup.
//! Components never name themselves through global state: they receive a
//! [`LogContext`] and log inside its span.

mod logger;
pub use logger::*;

mod context;
pub use context::LogContext;
