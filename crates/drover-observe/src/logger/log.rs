use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::OffsetTime, writer::BoxMakeWriter},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::logger::{
    config::{LOG_ENV, LogTarget, LoggerConfig},
    error::LoggerError,
    format::LoggerFormat,
};

type Filtered = Layered<EnvFilter, Registry>;

/// Install the process-wide subscriber described by `cfg`.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(&cfg.effective_level(env.as_deref()))?;
    let base = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LoggerFormat::Text => {
            let layer = fmt::layer::<Filtered>()
                .with_writer(writer(cfg.target))
                .with_ansi(cfg.use_color)
                .with_target(cfg.with_targets)
                .with_timer(local_timer());
            base.with(layer).try_init().map_err(install_error)
        }
        LoggerFormat::Json => {
            let layer = fmt::layer::<Filtered>()
                .json()
                .with_writer(writer(cfg.target))
                .with_current_span(true)
                .with_span_list(true)
                .with_target(cfg.with_targets)
                .with_timer(local_timer());
            base.with(layer).try_init().map_err(install_error)
        }
        LoggerFormat::Journald => install_journald(base),
    }
}

fn build_filter(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(directive).map_err(|e| LoggerError::BadFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

fn writer(target: LogTarget) -> BoxMakeWriter {
    match target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    }
}

/// RFC 3339 timestamps in the local offset, UTC when it cannot be read.
fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn install_error(e: impl std::fmt::Display) -> LoggerError {
    let msg = e.to_string();
    if msg.contains("global default") || msg.contains("SetGlobalDefaultError") {
        LoggerError::AlreadyInstalled
    } else {
        LoggerError::Install(msg)
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn install_journald(base: Filtered) -> Result<(), LoggerError> {
    let journald =
        tracing_journald::layer().map_err(|e| LoggerError::Install(format!("journald: {e}")))?;
    base.with(journald).try_init().map_err(install_error)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn install_journald(_base: Filtered) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_rejected() {
        let err = build_filter("drover=loud").unwrap_err();
        assert!(matches!(err, LoggerError::BadFilter { ref directive, .. } if directive == "drover=loud"));
    }

    #[test]
    fn good_directives_parse() {
        for directive in ["info", "drover_core=debug,warn", "drover_agent[task]=trace"] {
            assert!(build_filter(directive).is_ok(), "{directive}");
        }
    }

    #[test]
    fn second_install_maps_to_already_installed() {
        let err = install_error("a global default trace dispatcher has already been set");
        assert!(matches!(err, LoggerError::AlreadyInstalled));

        let err = install_error("permission denied");
        assert!(matches!(err, LoggerError::Install(s) if s == "permission denied"));
    }
}
