use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// Pin the process start instant. Later calls keep the first value.
pub fn mark_process_start() {
    PROCESS_START.get_or_init(Instant::now);
}

/// Time since [`mark_process_start`], or since the first call here if it
/// was never made.
pub fn process_uptime() -> Duration {
    PROCESS_START.get_or_init(Instant::now).elapsed()
}

/// Static facts about the machine a process runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub hostname: String,
    pub os: &'static str,
    pub arch: &'static str,
}

impl HostInfo {
    pub fn collect() -> Self {
        Self {
            hostname: hostname::get()
                .ok()
                .and_then(|raw| raw.into_string().ok())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}
