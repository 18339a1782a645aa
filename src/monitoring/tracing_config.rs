//! Structured logging with tracing
//!
//! Sets up:
//! - Console logging (text or JSON)
//! - File logging with daily rotation, always JSON
//! - Filter from RUST_LOG, falling back to the configured level

use super::config::{LogFormat, MonitoringConfig, LOG_FILE_PREFIX};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the global subscriber.
///
/// Returns the file writer guard when file logging is on; keep it alive for
/// the life of the process or buffered lines are lost.
pub fn init_tracing(config: &MonitoringConfig) -> std::io::Result<Option<WorkerGuard>> {
    if !config.enabled {
        return Ok(None);
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console_layer = config.enable_console_logging.then(|| {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true);
        match config.log_format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Text => layer.boxed(),
        }
    });

    let mut guard = None;
    let file_layer = if config.enable_file_logging {
        config.ensure_log_dir()?;
        let file_appender = daily(&config.log_dir, LOG_FILE_PREFIX);
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);
        Some(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .json(),
        )
    } else {
        None
    };

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_disabled() {
        let config = MonitoringConfig {
            enabled: false,
            ..MonitoringConfig::default()
        };
        assert!(init_tracing(&config).unwrap().is_none());
    }

    #[test]
    fn test_file_logging_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = MonitoringConfig {
            log_dir: tmp.path().join("logs"),
            enable_console_logging: false,
            ..MonitoringConfig::default()
        };
        let guard = init_tracing(&config).unwrap();
        assert!(guard.is_some());
        assert!(tmp.path().join("logs").is_dir());
    }
}
