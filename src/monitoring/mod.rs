//! Monitoring for the audio journal backend
//!
//! Provides:
//! - Structured logging with tracing (console + daily-rolled JSON file)
//! - Prometheus metrics collection
//! - Health and readiness state

pub mod config;
pub mod health;
pub mod metrics;
pub mod tracing_config;

pub use config::{LogFormat, MonitoringConfig};
pub use health::{HealthStatus, HealthTracker};
pub use metrics::{export_prometheus, REGISTRY};
pub use tracing_config::init_tracing;
