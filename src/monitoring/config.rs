//! Monitoring configuration
//!
//! Loads from environment variables:
//! - MONITORING_ENABLED: Enable/disable logging setup (true/false)
//! - LOG_LEVEL: Fallback filter when RUST_LOG is unset (default: info)
//! - LOG_FORMAT: Console output format (json or text)
//! - LOG_DIR: Directory for log files (default: <data dir>/audio-journal/logs)
//! - ENABLE_FILE_LOGGING / ENABLE_CONSOLE_LOGGING: toggle each sink

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const LOG_FILE_PREFIX: &str = "journal.log";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,

    /// Used when RUST_LOG is not set
    pub log_level: String,

    pub log_format: LogFormat,

    pub log_dir: PathBuf,

    pub enable_file_logging: bool,

    pub enable_console_logging: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            log_dir: Self::default_log_dir(),
            enable_file_logging: true,
            enable_console_logging: true,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl MonitoringConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(enabled) = env_flag("MONITORING_ENABLED") {
            config.enabled = enabled;
        }

        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            if !log_level.trim().is_empty() {
                config.log_level = log_level;
            }
        }

        if let Ok(log_format) = std::env::var("LOG_FORMAT") {
            if let Ok(format) = log_format.parse() {
                config.log_format = format;
            }
        }

        if let Ok(log_dir) = std::env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }

        if let Some(file) = env_flag("ENABLE_FILE_LOGGING") {
            config.enable_file_logging = file;
        }

        if let Some(console) = env_flag("ENABLE_CONSOLE_LOGGING") {
            config.enable_console_logging = console;
        }

        config
    }

    /// `<local data dir>/audio-journal/logs`, `/tmp/audio-journal/logs` as a last resort.
    pub fn default_log_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("audio-journal")
            .join("logs")
    }

    pub fn ensure_log_dir(&self) -> std::io::Result<()> {
        if !self.log_dir.exists() {
            std::fs::create_dir_all(&self.log_dir)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o755);
                std::fs::set_permissions(&self.log_dir, perms)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitoringConfig::default();
        assert!(config.enabled);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.log_dir.ends_with("audio-journal/logs"));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("invalid".parse::<LogFormat>().is_err());
    }
}
