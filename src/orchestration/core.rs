//! # Orchestration Core
//!
//! Owns the shared components (metrics store, breaker registry, scheduler,
//! maintenance controller, broadcaster) and runs the periodic loops:
//! health checks, circuit breaker aging, system resource sampling, the
//! bounded recovery loop, and the event-forwarding loop that delivers
//! transitions to the alert/audit sinks. Each loop is a `tokio::select!`
//! between its interval sleep and the shared shutdown notification.

use crate::alerts::{AlertForwarder, AlertSeverity, AuditSink, LogAlertForwarder, LogAuditSink};
use crate::broadcast::ClientBroadcaster;
use crate::config::{ConfigManager, OrchestrationConfig};
use crate::events::{EventPublisher, OrchestrationEvent, PublishedEvent};
use crate::health::{DependencyProbe, HealthCheckScheduler};
use crate::maintenance::MaintenanceController;
use crate::metrics::{MetricsStore, SystemSampler};
use crate::resilience::{CircuitBreakerManager, CircuitState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Context object wiring all health-orchestration components
pub struct OrchestrationCore {
    id: Uuid,
    config: OrchestrationConfig,
    metrics: Arc<MetricsStore>,
    breakers: Arc<CircuitBreakerManager>,
    scheduler: Arc<HealthCheckScheduler>,
    maintenance: Arc<MaintenanceController>,
    broadcaster: Arc<ClientBroadcaster>,
    sampler: Arc<SystemSampler>,
    publisher: EventPublisher,
    alert_forwarder: Arc<dyn AlertForwarder>,
    audit_sink: Arc<dyn AuditSink>,
    shutdown_notify: Arc<Notify>,
    stop_flag: Arc<AtomicBool>,
    running: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl OrchestrationCore {
    /// Construct a fully wired core from configuration and the external
    /// collaborator sinks
    pub fn new(
        config: OrchestrationConfig,
        alert_forwarder: Arc<dyn AlertForwarder>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        let id = Uuid::new_v4();
        let metrics = Arc::new(MetricsStore::new());
        let publisher = EventPublisher::default();
        let breakers = Arc::new(CircuitBreakerManager::new(
            config.circuit_breakers.clone(),
            publisher.clone(),
        ));
        let scheduler = Arc::new(HealthCheckScheduler::new(
            config.health.clone(),
            Arc::clone(&breakers),
            Arc::clone(&metrics),
        ));
        let broadcaster = Arc::new(ClientBroadcaster::new(
            config.broadcast.clone(),
            Arc::clone(&metrics),
        ));
        let maintenance = Arc::new(MaintenanceController::new(
            config.maintenance.clone(),
            Arc::clone(&broadcaster),
            publisher.clone(),
        ));
        let sampler = Arc::new(SystemSampler::new(Arc::clone(&metrics)));

        info!(
            core_id = %id,
            service = %config.system.service_name,
            "Orchestration core constructed"
        );

        Self {
            id,
            config,
            metrics,
            breakers,
            scheduler,
            maintenance,
            broadcaster,
            sampler,
            publisher,
            alert_forwarder,
            audit_sink,
            shutdown_notify: Arc::new(Notify::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Build a fully wired core from a loaded configuration manager, using
    /// the log-backed alert and audit sinks
    pub fn from_config(manager: &ConfigManager) -> Self {
        Self::new(
            manager.config().clone(),
            Arc::new(LogAlertForwarder),
            Arc::new(LogAuditSink),
        )
    }

    /// Load configuration from a directory and build a core with the
    /// log-backed sinks
    pub fn from_config_directory(
        config_dir: Option<std::path::PathBuf>,
    ) -> crate::error::Result<Self> {
        let manager = ConfigManager::load_from_directory(config_dir)?;
        Ok(Self::from_config(&manager))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsStore> {
        &self.metrics
    }

    pub fn circuit_breakers(&self) -> &Arc<CircuitBreakerManager> {
        &self.breakers
    }

    pub fn health_scheduler(&self) -> &Arc<HealthCheckScheduler> {
        &self.scheduler
    }

    pub fn maintenance(&self) -> &Arc<MaintenanceController> {
        &self.maintenance
    }

    pub fn broadcaster(&self) -> &Arc<ClientBroadcaster> {
        &self.broadcaster
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Register a dependency probe with the health scheduler
    pub async fn register_probe(
        &self,
        dependency: impl Into<String>,
        probe: Arc<dyn DependencyProbe>,
        critical: bool,
    ) {
        self.scheduler.register_probe(dependency, probe, critical).await;
    }

    /// Externally reported unrecoverable error: always transitions the
    /// system into maintenance
    pub async fn report_fatal_error(&self, reason: &str) {
        warn!(reason = reason, "Fatal error reported");
        self.maintenance.enter_maintenance(reason).await;
    }

    /// Spawn the periodic loops. Idempotent: calling start on a running
    /// core is a no-op.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop_flag.store(false, Ordering::Release);

        info!(core_id = %self.id, "Starting orchestration loops");

        let mut handles = self.handles.lock().await;

        // Health check loop: probe, classify, hand the report to the
        // maintenance controller
        {
            let scheduler = Arc::clone(&self.scheduler);
            let maintenance = Arc::clone(&self.maintenance);
            let shutdown = Arc::clone(&self.shutdown_notify);
            let stop_flag = Arc::clone(&self.stop_flag);
            let interval = self.config.health.check_interval();
            handles.push(tokio::spawn(async move {
                run_interval_loop("health_check", interval, shutdown, stop_flag, move || {
                    let scheduler = Arc::clone(&scheduler);
                    let maintenance = Arc::clone(&maintenance);
                    async move {
                        let report = scheduler.run_checks().await;
                        maintenance.handle_report(&report).await;
                    }
                })
                .await;
            }));
        }

        // Circuit breaker aging loop: open circuits age to half-open even
        // with no traffic
        {
            let breakers = Arc::clone(&self.breakers);
            let shutdown = Arc::clone(&self.shutdown_notify);
            let stop_flag = Arc::clone(&self.stop_flag);
            let interval = self.config.circuit_breakers.transition_check_interval();
            handles.push(tokio::spawn(async move {
                run_interval_loop("breaker_aging", interval, shutdown, stop_flag, move || {
                    let breakers = Arc::clone(&breakers);
                    async move {
                        breakers.run_transition_checks().await;
                    }
                })
                .await;
            }));
        }

        // System resource sampling loop
        {
            let sampler = Arc::clone(&self.sampler);
            let shutdown = Arc::clone(&self.shutdown_notify);
            let stop_flag = Arc::clone(&self.stop_flag);
            let interval = Duration::from_millis(self.config.system.sample_interval_ms);
            handles.push(tokio::spawn(async move {
                run_interval_loop("system_sampler", interval, shutdown, stop_flag, move || {
                    let sampler = Arc::clone(&sampler);
                    async move {
                        sampler.sample();
                    }
                })
                .await;
            }));
        }

        // Bounded recovery loop
        {
            let maintenance = Arc::clone(&self.maintenance);
            let scheduler = Arc::clone(&self.scheduler);
            let shutdown = Arc::clone(&self.shutdown_notify);
            let stop_flag = Arc::clone(&self.stop_flag);
            let interval = self.config.maintenance.recovery_interval();
            handles.push(tokio::spawn(async move {
                run_interval_loop("recovery", interval, shutdown, stop_flag, move || {
                    let maintenance = Arc::clone(&maintenance);
                    let scheduler = Arc::clone(&scheduler);
                    async move {
                        maintenance.recovery_tick(&scheduler).await;
                    }
                })
                .await;
            }));
        }

        // Event-forwarding loop: deliver transitions to the alert/audit
        // sinks without ever blocking the components that published them
        {
            let rx = self.publisher.subscribe();
            let alerts = Arc::clone(&self.alert_forwarder);
            let audit = Arc::clone(&self.audit_sink);
            let shutdown = Arc::clone(&self.shutdown_notify);
            let stop_flag = Arc::clone(&self.stop_flag);
            handles.push(tokio::spawn(async move {
                run_event_forwarding_loop(rx, alerts, audit, shutdown, stop_flag).await;
            }));
        }
    }

    /// Stop all loops: terminal maintenance-controller shutdown, final
    /// client notification, then join every loop task
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        info!(core_id = %self.id, "Stopping orchestration loops");

        self.maintenance.shutdown("planned shutdown").await;
        // Flag first: a loop that is mid-tick when notify_waiters fires
        // re-checks it on the next iteration instead of sleeping again
        self.stop_flag.store(true, Ordering::Release);
        self.shutdown_notify.notify_waiters();

        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        info!(core_id = %self.id, "Orchestration loops stopped");
    }
}

/// Generic interval loop: wait for interval or shutdown, then tick
async fn run_interval_loop<F, Fut>(
    name: &'static str,
    interval: Duration,
    shutdown: Arc<Notify>,
    stop_flag: Arc<AtomicBool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    debug!(loop_name = name, interval_ms = interval.as_millis() as u64, "Loop started");

    while !stop_flag.load(Ordering::Acquire) {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                tick().await;
            }
            _ = shutdown.notified() => {
                debug!(loop_name = name, "Shutdown notification received");
                break;
            }
        }
    }

    debug!(loop_name = name, "Loop ended");
}

/// Subscribe to orchestration events and deliver them to the sinks
async fn run_event_forwarding_loop(
    mut rx: broadcast::Receiver<PublishedEvent>,
    alerts: Arc<dyn AlertForwarder>,
    audit: Arc<dyn AuditSink>,
    shutdown: Arc<Notify>,
    stop_flag: Arc<AtomicBool>,
) {
    while !stop_flag.load(Ordering::Acquire) {
        tokio::select! {
            received = rx.recv() => {
                match received {
                    Ok(published) => forward_event(published, &alerts, &audit).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Event forwarding lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = shutdown.notified() => break,
        }
    }
}

/// Map one orchestration event onto the audit sink and, for the
/// significant transitions, the alert forwarder
async fn forward_event(
    published: PublishedEvent,
    alerts: &Arc<dyn AlertForwarder>,
    audit: &Arc<dyn AuditSink>,
) {
    let event = published.event;

    let severity = match &event {
        OrchestrationEvent::BreakerTransition { to, .. } => {
            if *to == CircuitState::Open {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Info
            }
        }
        OrchestrationEvent::MaintenanceEntered { .. } => AlertSeverity::Critical,
        OrchestrationEvent::MaintenanceExited => AlertSeverity::Info,
        OrchestrationEvent::RecoveryAttempt { succeeded, .. } => {
            if *succeeded {
                AlertSeverity::Info
            } else {
                AlertSeverity::Warning
            }
        }
    };

    let details = serde_json::to_value(&event).unwrap_or_else(|_| serde_json::json!({}));
    audit
        .log_system_event(event.action(), details, severity)
        .await;

    match &event {
        OrchestrationEvent::BreakerTransition { dependency, to, .. }
            if *to == CircuitState::Open =>
        {
            alerts
                .forward(
                    "Circuit breaker opened",
                    &format!("Dependency '{dependency}' is failing fast"),
                    AlertSeverity::Critical,
                )
                .await;
        }
        OrchestrationEvent::MaintenanceEntered { reason } => {
            alerts
                .forward("Maintenance mode active", reason, AlertSeverity::Critical)
                .await;
        }
        OrchestrationEvent::MaintenanceExited => {
            alerts
                .forward(
                    "Maintenance mode resolved",
                    "Service restored to normal operation",
                    AlertSeverity::Info,
                )
                .await;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProbeFailure;
    use crate::maintenance::MaintenanceMode;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;

    struct RecordingAlerts {
        alerts: SyncMutex<Vec<(String, AlertSeverity)>>,
    }

    #[async_trait]
    impl AlertForwarder for RecordingAlerts {
        async fn forward(&self, title: &str, _message: &str, severity: AlertSeverity) {
            self.alerts.lock().push((title.to_string(), severity));
        }
    }

    struct RecordingAudit {
        actions: SyncMutex<Vec<String>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAudit {
        async fn log_system_event(
            &self,
            action: &str,
            _details: serde_json::Value,
            _severity: AlertSeverity,
        ) {
            self.actions.lock().push(action.to_string());
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl crate::health::DependencyProbe for FailingProbe {
        async fn probe(&self) -> Result<(), ProbeFailure> {
            Err(ProbeFailure::new("connection refused"))
        }
    }

    fn fast_config() -> OrchestrationConfig {
        let mut config = OrchestrationConfig::default();
        config.health.check_interval_ms = 20;
        config.health.probe_timeout_ms = 10;
        config.circuit_breakers.transition_check_interval_ms = 20;
        config.circuit_breakers.reset_timeout_ms = 100;
        config.maintenance.recovery_interval_ms = 20;
        config.system.sample_interval_ms = 50;
        config
    }

    fn recording_core() -> (OrchestrationCore, Arc<RecordingAlerts>, Arc<RecordingAudit>) {
        let alerts = Arc::new(RecordingAlerts {
            alerts: SyncMutex::new(Vec::new()),
        });
        let audit = Arc::new(RecordingAudit {
            actions: SyncMutex::new(Vec::new()),
        });
        let core = OrchestrationCore::new(
            fast_config(),
            Arc::clone(&alerts) as Arc<dyn AlertForwarder>,
            Arc::clone(&audit) as Arc<dyn AuditSink>,
        );
        (core, alerts, audit)
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let (core, _, _) = recording_core();

        core.start().await;
        core.start().await;
        assert_eq!(core.handles.lock().await.len(), 5);

        core.stop().await;
        core.stop().await;
        assert!(core.handles.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_critical_probe_drives_system_into_maintenance() {
        let (core, alerts, audit) = recording_core();
        core.register_probe("cache", Arc::new(FailingProbe), true)
            .await;

        core.start().await;

        // A few health ticks plus event forwarding
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(core.maintenance().is_in_maintenance().await);

        core.stop().await;

        let alert_titles: Vec<String> =
            alerts.alerts.lock().iter().map(|(t, _)| t.clone()).collect();
        assert!(alert_titles.contains(&"Maintenance mode active".to_string()));

        let actions = audit.actions.lock();
        assert!(actions.iter().any(|a| a == "maintenance_entered"));
        assert!(actions.iter().any(|a| a == "recovery_attempt"));
    }

    #[tokio::test]
    async fn test_from_config_directory_defaults_when_no_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let core =
            OrchestrationCore::from_config_directory(Some(dir.path().to_path_buf())).unwrap();

        assert_eq!(core.config().circuit_breakers.failure_threshold, 5);
        assert_eq!(core.config().maintenance.max_recovery_attempts, 3);
    }

    #[tokio::test]
    async fn test_report_fatal_error_enters_maintenance_directly() {
        let (core, _, _) = recording_core();

        core.report_fatal_error("unrecoverable datastore corruption")
            .await;

        let state = core.maintenance().state().await;
        assert_eq!(state.mode, MaintenanceMode::Maintenance);
        assert_eq!(
            state.reason.as_deref(),
            Some("unrecoverable datastore corruption")
        );
    }
}
