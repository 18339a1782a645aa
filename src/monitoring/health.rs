//! Liveness and readiness state for `/health` and `/ready`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_seconds: f64,
    pub database: ComponentStatus,
}

pub struct HealthTracker {
    is_ready: AtomicBool,
    startup_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            is_ready: AtomicBool::new(false),
            startup_time: Instant::now(),
        }
    }

    /// Call once the server is wired up; `/ready` returns 503 until then.
    pub fn mark_ready(&self) {
        self.is_ready.store(true, Ordering::SeqCst);
        tracing::info!(
            startup_ms = self.startup_time.elapsed().as_millis() as u64,
            "System marked as ready"
        );
    }

    pub fn mark_not_ready(&self) {
        self.is_ready.store(false, Ordering::SeqCst);
        tracing::warn!("System marked as not ready");
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    pub fn status(&self, database_ok: bool) -> HealthStatus {
        let database = if database_ok {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        };
        HealthStatus {
            status: database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.startup_time.elapsed().as_secs_f64(),
            database,
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_tracker_creation() {
        let tracker = HealthTracker::new();
        assert!(!tracker.is_ready());
    }

    #[test]
    fn test_mark_ready_and_back() {
        let tracker = HealthTracker::new();
        tracker.mark_ready();
        assert!(tracker.is_ready());
        tracker.mark_not_ready();
        assert!(!tracker.is_ready());
    }

    #[test]
    fn test_status_follows_database() {
        let tracker = HealthTracker::new();
        assert_eq!(tracker.status(true).status, ComponentStatus::Healthy);
        assert_eq!(tracker.status(false).status, ComponentStatus::Unhealthy);
    }
}
