//! # Health Check Scheduler
//!
//! Runs the per-tick evaluation: actively probes every registered
//! dependency under an explicit timeout, folds in circuit breaker state,
//! samples the system resource gauges, and aggregates everything into an
//! overall verdict. Probe failures are absorbed here -- they become
//! `Unhealthy` results and breaker failure observations, never panics or
//! errors for the caller.

use crate::config::HealthConfig;
use crate::health::{
    DependencyProbe, HealthCheckResult, HealthReport, HealthStatus,
};
use crate::metrics::MetricsStore;
use crate::resilience::{CircuitBreakerManager, CircuitState};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const SYSTEM_CHECK_NAME: &str = "system_resources";

struct ProbeRegistration {
    probe: Arc<dyn DependencyProbe>,
    critical: bool,
}

/// Periodic health evaluator over all registered dependencies
pub struct HealthCheckScheduler {
    probes: RwLock<HashMap<String, ProbeRegistration>>,
    breakers: Arc<CircuitBreakerManager>,
    metrics: Arc<MetricsStore>,
    config: HealthConfig,
}

impl HealthCheckScheduler {
    pub fn new(
        config: HealthConfig,
        breakers: Arc<CircuitBreakerManager>,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        Self {
            probes: RwLock::new(HashMap::new()),
            breakers,
            metrics,
            config,
        }
    }

    /// Register a dependency probe. Critical dependencies feed the
    /// maintenance trigger; non-critical ones only affect the verdict.
    pub async fn register_probe(
        &self,
        dependency: impl Into<String>,
        probe: Arc<dyn DependencyProbe>,
        critical: bool,
    ) {
        let dependency = dependency.into();
        debug!(
            dependency = %dependency,
            critical = critical,
            "Registered dependency probe"
        );
        self.probes
            .write()
            .await
            .insert(dependency, ProbeRegistration { probe, critical });
    }

    /// Run one full evaluation tick and return the aggregated report
    pub async fn run_checks(&self) -> HealthReport {
        let registrations: Vec<(String, Arc<dyn DependencyProbe>, bool)> = {
            let probes = self.probes.read().await;
            probes
                .iter()
                .map(|(name, reg)| (name.clone(), Arc::clone(&reg.probe), reg.critical))
                .collect()
        };

        // Probe all dependencies concurrently; each probe is individually
        // bounded by the configured timeout
        let checks = registrations
            .iter()
            .map(|(name, probe, _)| self.check_dependency(name.clone(), Arc::clone(probe)));
        let mut results: Vec<HealthCheckResult> = join_all(checks).await;

        results.push(self.check_system_resources());

        let verdict = results
            .iter()
            .fold(HealthStatus::Healthy, |acc, r| acc.worst(r.status));

        let critical_unhealthy: Vec<String> = registrations
            .iter()
            .filter(|(name, _, critical)| {
                *critical
                    && results
                        .iter()
                        .any(|r| r.check_name == *name && r.status == HealthStatus::Unhealthy)
            })
            .map(|(name, _, _)| name.clone())
            .collect();

        if verdict != HealthStatus::Healthy {
            warn!(
                verdict = ?verdict,
                critical_unhealthy = ?critical_unhealthy,
                "Health check tick completed with degraded verdict"
            );
        } else {
            debug!(checks = results.len(), "Health check tick completed");
        }

        HealthReport {
            results,
            verdict,
            critical_unhealthy,
            checked_at: chrono::Utc::now(),
        }
    }

    /// Probe one dependency and classify the result
    async fn check_dependency(
        &self,
        name: String,
        probe: Arc<dyn DependencyProbe>,
    ) -> HealthCheckResult {
        let breaker = self.breakers.breaker(&name).await;
        breaker.check_transition().await;

        // An open breaker short-circuits: no probe is issued, no latency is
        // incurred from the real dependency
        if breaker.state() == CircuitState::Open {
            return HealthCheckResult {
                check_name: name,
                status: HealthStatus::Unhealthy,
                timestamp: chrono::Utc::now(),
                detail: "circuit breaker open; probe skipped".to_string(),
            };
        }

        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.probe_timeout(), probe.probe()).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let (status, detail, success) = match outcome {
            Ok(Ok(())) => {
                if latency_ms > self.config.latency_warning_threshold_ms as f64 {
                    (
                        HealthStatus::Degraded,
                        format!("probe latency {latency_ms:.0}ms exceeds warning threshold"),
                        true,
                    )
                } else {
                    (
                        HealthStatus::Healthy,
                        format!("probe ok in {latency_ms:.0}ms"),
                        true,
                    )
                }
            }
            Ok(Err(failure)) => (
                HealthStatus::Unhealthy,
                format!("probe failed: {failure}"),
                false,
            ),
            Err(_) => (
                HealthStatus::Unhealthy,
                format!(
                    "probe timed out after {}ms",
                    self.config.probe_timeout_ms
                ),
                false,
            ),
        };

        self.metrics.record_operation(&name, success, latency_ms);
        if success {
            breaker.record_success().await;
        } else {
            breaker.record_failure().await;
        }

        HealthCheckResult {
            check_name: name,
            status,
            timestamp: chrono::Utc::now(),
            detail,
        }
    }

    /// Passive evaluation of the system resource gauges
    fn check_system_resources(&self) -> HealthCheckResult {
        let gauges = self.metrics.system_gauges();
        let memory_ratio = gauges.memory_used_ratio();
        let cpu_fraction = gauges.cpu_load_average / 100.0;
        let threshold = self.config.resource_pressure_threshold;

        let (status, detail) = if memory_ratio > threshold || cpu_fraction > threshold {
            (
                HealthStatus::Degraded,
                format!(
                    "resource pressure: memory {:.0}%, cpu {:.0}%",
                    memory_ratio * 100.0,
                    gauges.cpu_load_average
                ),
            )
        } else {
            (
                HealthStatus::Healthy,
                format!(
                    "memory {:.0}%, cpu {:.0}%",
                    memory_ratio * 100.0,
                    gauges.cpu_load_average
                ),
            )
        };

        HealthCheckResult {
            check_name: SYSTEM_CHECK_NAME.to_string(),
            status,
            timestamp: chrono::Utc::now(),
            detail,
        }
    }
}
