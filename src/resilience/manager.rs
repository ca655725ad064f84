//! # Circuit Breaker Manager
//!
//! Owns the per-dependency breaker map. Breakers are created lazily on
//! first observation for a dependency and never destroyed while the
//! process runs. Also drives the proactive aging sweep that moves idle
//! open breakers to half-open.

use crate::config::CircuitBreakerSettings;
use crate::events::EventPublisher;
use crate::resilience::{CircuitBreaker, CircuitBreakerSnapshot, CircuitState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Registry of circuit breakers keyed by dependency name
#[derive(Debug)]
pub struct CircuitBreakerManager {
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    settings: CircuitBreakerSettings,
    publisher: EventPublisher,
}

impl CircuitBreakerManager {
    pub fn new(settings: CircuitBreakerSettings, publisher: EventPublisher) -> Self {
        Self {
            breakers: RwLock::new(HashMap::new()),
            settings,
            publisher,
        }
    }

    /// Get or lazily create the circuit breaker for a dependency
    pub async fn breaker(&self, dependency: &str) -> Arc<CircuitBreaker> {
        // Fast path: breaker already exists
        {
            let breakers = self.breakers.read().await;
            if let Some(breaker) = breakers.get(dependency) {
                return Arc::clone(breaker);
            }
        }

        let mut breakers = self.breakers.write().await;

        // Double-check pattern (another task might have created it)
        if let Some(breaker) = breakers.get(dependency) {
            return Arc::clone(breaker);
        }

        let breaker = Arc::new(
            CircuitBreaker::new(dependency.to_string(), self.settings.clone())
                .with_publisher(self.publisher.clone()),
        );
        breakers.insert(dependency.to_string(), Arc::clone(&breaker));

        info!(
            dependency = dependency,
            total_breakers = breakers.len(),
            "Created new circuit breaker"
        );

        breaker
    }

    /// All dependency names with a breaker
    pub async fn dependencies(&self) -> Vec<String> {
        let breakers = self.breakers.read().await;
        breakers.keys().cloned().collect()
    }

    /// Proactive aging sweep over every breaker; runs on the fixed
    /// transition-check tick so open circuits age even with no traffic
    pub async fn run_transition_checks(&self) {
        let breakers: Vec<Arc<CircuitBreaker>> = {
            let breakers = self.breakers.read().await;
            breakers.values().cloned().collect()
        };

        for breaker in breakers {
            breaker.check_transition().await;
        }
    }

    /// Current state of every breaker
    pub async fn states(&self) -> HashMap<String, CircuitState> {
        let breakers = self.breakers.read().await;
        let mut states = HashMap::with_capacity(breakers.len());
        for (name, breaker) in breakers.iter() {
            states.insert(name.clone(), breaker.state());
        }
        states
    }

    /// Snapshot of every breaker for health reporting
    pub async fn snapshot_all(&self) -> Vec<CircuitBreakerSnapshot> {
        let breakers: Vec<Arc<CircuitBreaker>> = {
            let breakers = self.breakers.read().await;
            breakers.values().cloned().collect()
        };

        let mut snapshots = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            snapshots.push(breaker.snapshot().await);
        }
        snapshots
    }
}
