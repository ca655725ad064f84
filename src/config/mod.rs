//! # Congregate Core Configuration System
//!
//! Configuration management for the health-orchestration core. All
//! thresholds and intervals consumed by the scheduler, circuit breakers,
//! maintenance controller and broadcaster are supplied here at startup --
//! there are no hardcoded fallbacks at the call sites.
//!
//! ## Architecture
//!
//! - **Single Source of Truth**: all configuration comes from YAML files
//! - **Environment Awareness**: supports development/test/production overrides
//! - **Explicit Validation**: invalid combinations fail at load time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use congregate_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let interval = manager.config().health.check_interval_ms;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring congregate-config.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// System-wide settings
    pub system: SystemConfig,

    /// Health check scheduler configuration
    pub health: HealthConfig,

    /// Circuit breaker configuration
    pub circuit_breakers: CircuitBreakerSettings,

    /// Maintenance mode and recovery loop configuration
    pub maintenance: MaintenanceConfig,

    /// Client broadcaster configuration
    pub broadcast: BroadcastConfig,
}

/// System-wide settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Service name used in logs and audit events
    pub service_name: String,

    /// Interval between system resource samples (memory, CPU)
    pub sample_interval_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            service_name: "congregate-core".to_string(),
            sample_interval_ms: 5_000,
        }
    }
}

/// Health check scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Interval between scheduler ticks
    pub check_interval_ms: u64,

    /// Upper bound for a single dependency probe. A probe that exceeds this
    /// is treated identically to a failed probe.
    pub probe_timeout_ms: u64,

    /// Probe latency above which a dependency is classified degraded
    pub latency_warning_threshold_ms: u64,

    /// Memory-used ratio / CPU utilization fraction above which the system
    /// resource check is classified degraded (0.0 - 1.0)
    pub resource_pressure_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5_000,
            probe_timeout_ms: 5_000,
            latency_warning_threshold_ms: 1_000,
            resource_pressure_threshold: 0.9,
        }
    }
}

impl HealthConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Circuit breaker configuration applied to every dependency breaker
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures required to open a breaker
    pub failure_threshold: u32,

    /// Time an open breaker waits before allowing a half-open trial
    pub reset_timeout_ms: u64,

    /// Interval of the proactive aging tick that moves idle open breakers
    /// to half-open even with no traffic
    pub transition_check_interval_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            transition_check_interval_ms: 1_000,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn transition_check_interval(&self) -> Duration {
        Duration::from_millis(self.transition_check_interval_ms)
    }
}

/// Maintenance mode and bounded recovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Automatic recovery attempts before leaving the system in maintenance
    /// pending manual intervention
    pub max_recovery_attempts: u32,

    /// Interval between recovery attempts while in maintenance
    pub recovery_interval_ms: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_recovery_attempts: 3,
            recovery_interval_ms: 5_000,
        }
    }
}

impl MaintenanceConfig {
    pub fn recovery_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_interval_ms)
    }
}

/// Client broadcaster configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Upper bound for a single per-connection send
    pub send_timeout_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
        }
    }
}

impl BroadcastConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl OrchestrationConfig {
    /// Validate the loaded configuration. Invalid combinations are rejected
    /// at load time rather than surfacing as stalled loops later.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.circuit_breakers.failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "circuit_breakers.failure_threshold",
                "must be at least 1",
            ));
        }
        if self.health.check_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "health.check_interval_ms",
                "must be positive",
            ));
        }
        if self.health.probe_timeout_ms > self.health.check_interval_ms {
            return Err(ConfigurationError::invalid_value(
                "health.probe_timeout_ms",
                "must not exceed health.check_interval_ms",
            ));
        }
        if !(0.0..=1.0).contains(&self.health.resource_pressure_threshold) {
            return Err(ConfigurationError::invalid_value(
                "health.resource_pressure_threshold",
                "must be within 0.0..=1.0",
            ));
        }
        if self.maintenance.recovery_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "maintenance.recovery_interval_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}
