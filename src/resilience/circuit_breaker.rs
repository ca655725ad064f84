//! # Circuit Breaker Implementation
//!
//! Per-dependency fault isolation to prevent cascade failures. A breaker
//! turns the stream of success/failure observations for one dependency into
//! an admission decision: Closed admits everything, Open fails fast, and
//! Half-Open admits exactly one trial observation that decides the next
//! state.
//!
//! The open-to-half-open transition check runs both reactively (on every
//! observation) and proactively through
//! [`super::CircuitBreakerManager::run_transition_checks`], so an idle open
//! breaker still ages into half-open with no traffic.

use crate::config::CircuitBreakerSettings;
use crate::events::{EventPublisher, OrchestrationEvent};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - the next observation decides the outcome
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {dependency}")]
    CircuitOpen { dependency: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Mutable breaker state, serialized behind one mutex
#[derive(Debug, Default)]
struct BreakerStats {
    consecutive_failures: u32,
    last_failure_time: Option<Instant>,
    last_success_time: Option<Instant>,
}

/// Serializable view of one breaker for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSnapshot {
    pub dependency: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub ms_since_last_failure: Option<u64>,
    pub ms_since_last_success: Option<u64>,
    pub reset_timeout_ms: u64,
}

/// Core circuit breaker with atomic state word and mutex-serialized transitions
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Dependency name for logging and metrics
    name: String,

    /// Current circuit state (atomic for lock-free reads)
    state: AtomicU8,

    /// Configuration parameters
    config: CircuitBreakerSettings,

    /// Mutable state protected by mutex; every transition holds this lock,
    /// which gives the per-dependency total ordering
    stats: Mutex<BreakerStats>,

    /// Optional transition event channel for the alert/audit forwarding loop
    publisher: Option<EventPublisher>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker for the named dependency
    pub fn new(name: String, config: CircuitBreakerSettings) -> Self {
        info!(
            dependency = %name,
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout_ms,
            "🛡️ Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            stats: Mutex::new(BreakerStats::default()),
            publisher: None,
        }
    }

    /// Attach the transition event channel
    pub fn with_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Get dependency name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute an operation with circuit breaker protection. While the
    /// circuit is open the operation is not executed at all; the call fails
    /// fast without incurring latency from the real dependency.
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.allow_request().await {
            return Err(CircuitBreakerError::CircuitOpen {
                dependency: self.name.clone(),
            });
        }

        let start_time = Instant::now();
        let result = operation().await;
        let duration = start_time.elapsed();

        match &result {
            Ok(_) => self.record_success().await,
            Err(_) => self.record_failure().await,
        }

        debug!(
            dependency = %self.name,
            duration_ms = duration.as_millis() as u64,
            success = result.is_ok(),
            "Protected call completed"
        );

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Check whether a call should be admitted right now. Ages an expired
    /// open circuit into half-open before deciding.
    pub async fn allow_request(&self) -> bool {
        let mut stats = self.stats.lock().await;
        self.age_open_circuit(&mut stats);

        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        }
    }

    /// Record a successful observation for this dependency
    pub async fn record_success(&self) {
        let mut stats = self.stats.lock().await;
        self.age_open_circuit(&mut stats);
        stats.last_success_time = Some(Instant::now());

        match self.state() {
            CircuitState::Closed => {
                stats.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                // Trial call succeeded - the dependency has recovered
                stats.consecutive_failures = 0;
                self.transition(&stats, CircuitState::Closed);
            }
            CircuitState::Open => {
                warn!(
                    dependency = %self.name,
                    "Success recorded while circuit is open"
                );
            }
        }
    }

    /// Record a failed observation for this dependency
    pub async fn record_failure(&self) {
        let mut stats = self.stats.lock().await;
        self.age_open_circuit(&mut stats);

        match self.state() {
            CircuitState::Closed => {
                stats.consecutive_failures += 1;
                if stats.consecutive_failures >= self.config.failure_threshold {
                    stats.last_failure_time = Some(Instant::now());
                    error!(
                        dependency = %self.name,
                        consecutive_failures = stats.consecutive_failures,
                        failure_threshold = self.config.failure_threshold,
                        "🔴 Circuit breaker opened (failing fast)"
                    );
                    self.transition(&stats, CircuitState::Open);
                } else {
                    stats.last_failure_time = Some(Instant::now());
                    debug!(
                        dependency = %self.name,
                        consecutive_failures = stats.consecutive_failures,
                        "Failure recorded"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Trial call failed - back to failing fast
                stats.last_failure_time = Some(Instant::now());
                error!(
                    dependency = %self.name,
                    "🔴 Circuit breaker re-opened (trial call failed)"
                );
                self.transition(&stats, CircuitState::Open);
            }
            CircuitState::Open => {
                // Already open, nothing to record; the aging clock must not
                // be refreshed by short-circuited traffic
            }
        }
    }

    /// Proactive aging check used by the 1-second transition tick
    pub async fn check_transition(&self) {
        let mut stats = self.stats.lock().await;
        self.age_open_circuit(&mut stats);
    }

    /// Serializable view of the breaker for health reporting
    pub async fn snapshot(&self) -> CircuitBreakerSnapshot {
        let stats = self.stats.lock().await;

        CircuitBreakerSnapshot {
            dependency: self.name.clone(),
            state: self.state(),
            consecutive_failures: stats.consecutive_failures,
            ms_since_last_failure: stats
                .last_failure_time
                .map(|t| t.elapsed().as_millis() as u64),
            ms_since_last_success: stats
                .last_success_time
                .map(|t| t.elapsed().as_millis() as u64),
            reset_timeout_ms: self.config.reset_timeout_ms,
        }
    }

    /// Move an expired open circuit to half-open. Caller must hold the
    /// stats lock.
    fn age_open_circuit(&self, stats: &mut BreakerStats) {
        if self.state() != CircuitState::Open {
            return;
        }

        let reset_timeout = Duration::from_millis(self.config.reset_timeout_ms);
        match stats.last_failure_time {
            Some(last_failure) if last_failure.elapsed() >= reset_timeout => {
                info!(
                    dependency = %self.name,
                    "🟡 Circuit breaker half-open (testing recovery)"
                );
                self.transition(stats, CircuitState::HalfOpen);
            }
            Some(_) => {}
            None => {
                // Open without a failure timestamp would break the aging
                // clock entirely; recover by allowing a trial
                warn!(
                    dependency = %self.name,
                    "Circuit open but no failure timestamp recorded"
                );
                self.transition(stats, CircuitState::HalfOpen);
            }
        }
    }

    /// Store the new state and publish the transition. Caller must hold the
    /// stats lock so transitions stay totally ordered.
    fn transition(&self, _stats: &BreakerStats, to: CircuitState) {
        let from = self.state();
        if from == to {
            return;
        }
        self.state.store(to as u8, Ordering::Release);

        if to == CircuitState::Closed {
            info!(dependency = %self.name, "🟢 Circuit breaker closed (recovered)");
        }

        if let Some(publisher) = &self.publisher {
            publisher.publish(OrchestrationEvent::BreakerTransition {
                dependency: self.name.clone(),
                from,
                to,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn test_settings(failure_threshold: u32, reset_timeout_ms: u64) -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            failure_threshold,
            reset_timeout_ms,
            transition_check_interval_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn test_starts_closed_and_success_keeps_it_closed() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(3, 100));

        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_success().await;
        assert_eq!(breaker.state(), CircuitState::Closed);

        let snapshot = breaker.snapshot().await;
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.ms_since_last_success.is_some());
    }

    #[tokio::test]
    async fn test_opens_only_at_failure_threshold() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(5, 30_000));

        for _ in 0..4 {
            breaker.record_failure().await;
            assert_eq!(breaker.state(), CircuitState::Closed);
        }

        breaker.record_failure().await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let snapshot = breaker.snapshot().await;
        assert_eq!(snapshot.consecutive_failures, 5);
        assert!(snapshot.ms_since_last_failure.is_some());
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(3, 30_000));

        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        breaker.record_failure().await;

        // Two failures after the reset - still below the threshold
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_ages_to_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(1, 50));

        breaker.record_failure().await;
        assert_eq!(breaker.state(), CircuitState::Open);

        // Still open before the timeout elapses
        breaker.check_transition().await;
        assert_eq!(breaker.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;
        breaker.check_transition().await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_half_open_success_closes_and_resets() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(1, 50));

        breaker.record_failure().await;
        sleep(Duration::from_millis(60)).await;
        breaker.check_transition().await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success().await;
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(1, 50));

        breaker.record_failure().await;
        sleep(Duration::from_millis(60)).await;
        breaker.check_transition().await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure().await;
        assert_eq!(breaker.state(), CircuitState::Open);

        // The refreshed failure timestamp restarts the aging clock
        sleep(Duration::from_millis(60)).await;
        breaker.check_transition().await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_half_open_is_single_shot() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(3, 50));

        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;
        breaker.check_transition().await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // First observation decides; the second applies to the new state
        breaker.record_success().await;
        breaker.record_failure().await;

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().await.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_call_short_circuits_while_open() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(1, 30_000));

        let _ = breaker
            .call(|| async { Err::<String, _>("boom") })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);

        let result = breaker
            .call(|| async { Ok::<_, String>("should not execute") })
            .await;
        assert!(matches!(
            result,
            Err(CircuitBreakerError::CircuitOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_full_recovery_cycle_via_call() {
        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(1, 50));

        let _ = breaker
            .call(|| async { Err::<String, _>("boom") })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);

        sleep(Duration::from_millis(60)).await;

        // Trial call is admitted and closes the circuit on success
        let result = breaker.call(|| async { Ok::<_, String>("PONG") }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_transitions_are_published() {
        let publisher = EventPublisher::new(16);
        let mut rx = publisher.subscribe();

        let breaker = CircuitBreaker::new("cache".to_string(), test_settings(1, 50))
            .with_publisher(publisher);

        breaker.record_failure().await;

        let published = rx.recv().await.unwrap();
        match published.event {
            OrchestrationEvent::BreakerTransition { dependency, to, .. } => {
                assert_eq!(dependency, "cache");
                assert_eq!(to, CircuitState::Open);
            }
            other => panic!("Unexpected event: {other:?}"),
        }
    }
}
