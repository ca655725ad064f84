//! # Maintenance-Mode Controller
//!
//! State machine `Normal ⇄ Maintenance` plus a terminal shutdown guard.
//! All mutations go through one async mutex so concurrent enter/exit/
//! recovery calls cannot race on the counters. Client notification and
//! event publication happen after the state change, outside the lock.

use crate::broadcast::{BroadcastEvent, ClientBroadcaster, MaintenanceStatus};
use crate::config::MaintenanceConfig;
use crate::events::{EventPublisher, OrchestrationEvent};
use crate::health::{HealthCheckScheduler, HealthReport};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Operating mode of the whole platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceMode {
    Normal,
    Maintenance,
}

/// Process-wide maintenance state; exactly one instance exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceState {
    pub mode: MaintenanceMode,
    pub entered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub exited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub recovery_attempts: u32,
    pub max_recovery_attempts: u32,
    pub reason: Option<String>,
}

impl MaintenanceState {
    fn new(max_recovery_attempts: u32) -> Self {
        Self {
            mode: MaintenanceMode::Normal,
            entered_at: None,
            exited_at: None,
            recovery_attempts: 0,
            max_recovery_attempts,
            reason: None,
        }
    }
}

/// Controller for the global maintenance switch and its recovery loop
pub struct MaintenanceController {
    state: Mutex<MaintenanceState>,
    shutting_down: AtomicBool,
    broadcaster: Arc<ClientBroadcaster>,
    publisher: EventPublisher,
    config: MaintenanceConfig,
}

impl MaintenanceController {
    pub fn new(
        config: MaintenanceConfig,
        broadcaster: Arc<ClientBroadcaster>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            state: Mutex::new(MaintenanceState::new(config.max_recovery_attempts)),
            shutting_down: AtomicBool::new(false),
            broadcaster,
            publisher,
            config,
        }
    }

    /// Current state snapshot
    pub async fn state(&self) -> MaintenanceState {
        self.state.lock().await.clone()
    }

    /// Whether the platform is currently in maintenance
    pub async fn is_in_maintenance(&self) -> bool {
        self.state.lock().await.mode == MaintenanceMode::Maintenance
    }

    /// React to a health tick: a report with a critical dependency
    /// unhealthy triggers maintenance. This is the single automatic
    /// trigger path; individual breaker flips never enter maintenance on
    /// their own.
    pub async fn handle_report(&self, report: &HealthReport) {
        if report.has_critical_failures() {
            let reason = format!(
                "critical dependency unhealthy: {}",
                report.critical_unhealthy.join(", ")
            );
            self.enter_maintenance(&reason).await;
        }
    }

    /// Enter maintenance mode. Idempotent: re-entry while already in
    /// maintenance leaves the original reason, entry timestamp and
    /// recovery counter untouched.
    pub async fn enter_maintenance(&self, reason: &str) {
        if self.shutting_down.load(Ordering::Acquire) {
            return;
        }

        {
            let mut state = self.state.lock().await;
            if state.mode == MaintenanceMode::Maintenance {
                return;
            }
            state.mode = MaintenanceMode::Maintenance;
            state.entered_at = Some(chrono::Utc::now());
            state.exited_at = None;
            state.recovery_attempts = 0;
            state.reason = Some(reason.to_string());
        }

        warn!(reason = reason, "🚧 Entering maintenance mode");

        self.broadcaster
            .broadcast(&BroadcastEvent::maintenance(
                MaintenanceStatus::Active,
                reason,
            ))
            .await;
        self.publisher.publish(OrchestrationEvent::MaintenanceEntered {
            reason: reason.to_string(),
        });
    }

    /// Exit maintenance mode back to normal operation
    pub async fn exit_maintenance(&self) {
        if self.shutting_down.load(Ordering::Acquire) {
            return;
        }

        {
            let mut state = self.state.lock().await;
            if state.mode == MaintenanceMode::Normal {
                return;
            }
            state.mode = MaintenanceMode::Normal;
            state.exited_at = Some(chrono::Utc::now());
            state.recovery_attempts = 0;
        }

        info!("✅ Exiting maintenance mode");

        self.broadcaster
            .broadcast(&BroadcastEvent::maintenance(
                MaintenanceStatus::Inactive,
                "service restored",
            ))
            .await;
        self.publisher.publish(OrchestrationEvent::MaintenanceExited);
    }

    /// One tick of the bounded recovery loop. While in maintenance and
    /// under the attempt bound, re-runs the health checks; success (no
    /// critical dependency unhealthy) exits maintenance. Every attempt is
    /// counted regardless of outcome; once the bound is reached no further
    /// automatic attempts are made.
    pub async fn recovery_tick(&self, scheduler: &HealthCheckScheduler) {
        if self.shutting_down.load(Ordering::Acquire) {
            return;
        }

        let attempt = {
            let mut state = self.state.lock().await;
            if state.mode != MaintenanceMode::Maintenance {
                return;
            }
            if state.recovery_attempts >= state.max_recovery_attempts {
                // Bound exhausted; stay in maintenance pending manual
                // intervention
                return;
            }
            state.recovery_attempts += 1;
            state.recovery_attempts
        };

        info!(
            attempt = attempt,
            max_attempts = self.config.max_recovery_attempts,
            "Attempting automatic recovery"
        );

        let report = scheduler.run_checks().await;
        let succeeded = !report.has_critical_failures();

        self.publisher.publish(OrchestrationEvent::RecoveryAttempt {
            attempt,
            succeeded,
        });

        if succeeded {
            info!(attempt = attempt, "Recovery attempt succeeded");
            self.exit_maintenance().await;
        } else {
            warn!(
                attempt = attempt,
                critical_unhealthy = ?report.critical_unhealthy,
                "Recovery attempt failed"
            );
            if attempt >= self.config.max_recovery_attempts {
                warn!(
                    "🚧 Automatic recovery exhausted; staying in maintenance pending manual intervention"
                );
            }
        }
    }

    /// Terminal transition for planned process shutdown: broadcasts a final
    /// inactive notification, then refuses all further state transitions.
    pub async fn shutdown(&self, reason: &str) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(reason = reason, "Maintenance controller shutting down");

        self.broadcaster
            .broadcast(&BroadcastEvent::maintenance(
                MaintenanceStatus::Inactive,
                reason,
            ))
            .await;
    }
}
