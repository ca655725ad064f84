//! # Health Check Module
//!
//! Periodic active probing of the platform's dependencies plus passive
//! evaluation of the system resource gauges, aggregated into an overall
//! health verdict. The scheduler never propagates probe errors upward; a
//! failing or hung probe becomes an `Unhealthy` check result and a circuit
//! breaker failure observation.

pub mod probe;
pub mod scheduler;

pub use probe::{DependencyProbe, ProbeFailure};
pub use scheduler::HealthCheckScheduler;

use serde::{Deserialize, Serialize};

/// Classification of a single health check, and of the aggregate verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Severity used for verdict aggregation (higher dominates)
    pub fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }

    /// The more severe of two statuses
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Result of one check on one scheduler tick. Previous results are
/// overwritten, not retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub check_name: String,
    pub status: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub detail: String,
}

/// Aggregated outcome of one scheduler tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub results: Vec<HealthCheckResult>,
    pub verdict: HealthStatus,

    /// Critical dependencies classified unhealthy on this tick; the
    /// maintenance controller keys off this list
    pub critical_unhealthy: Vec<String>,

    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Whether this report should trigger (or hold) maintenance mode
    pub fn has_critical_failures(&self) -> bool {
        !self.critical_unhealthy.is_empty()
    }
}
