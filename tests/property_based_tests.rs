//! Property-based tests for the metrics store and circuit breaker
//! invariants that must hold for arbitrary observation streams.

use congregate_core::config::CircuitBreakerSettings;
use congregate_core::metrics::MetricsStore;
use congregate_core::resilience::{CircuitBreaker, CircuitState};
use proptest::prelude::*;

proptest! {
    /// Property: the rolling mean stays within the observed latency range
    /// (after clamping) for any sequence of recorded operations
    #[test]
    fn rolling_mean_stays_within_observed_bounds(
        latencies in prop::collection::vec(-1_000.0f64..10_000.0, 1..50)
    ) {
        let store = MetricsStore::new();
        for latency in &latencies {
            store.record_operation("dep", true, *latency);
        }

        let clamped: Vec<f64> = latencies.iter().map(|l| l.max(0.0)).collect();
        let min = clamped.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = clamped.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let snapshot = store.snapshot();
        let avg = snapshot.operations["dep"].rolling_avg_latency_ms;
        prop_assert!(avg >= min - 1e-6 && avg <= max + 1e-6,
            "mean {avg} outside [{min}, {max}]");
    }

    /// Property: counters always reconcile - errors never exceed the total
    /// count, and the count equals the number of recorded operations
    #[test]
    fn error_count_never_exceeds_total(
        outcomes in prop::collection::vec(any::<bool>(), 1..100)
    ) {
        let store = MetricsStore::new();
        for success in &outcomes {
            store.record_operation("dep", *success, 1.0);
        }

        let snapshot = store.snapshot();
        let metrics = &snapshot.operations["dep"];
        prop_assert_eq!(metrics.count, outcomes.len() as u64);
        prop_assert_eq!(
            metrics.error_count,
            outcomes.iter().filter(|s| !**s).count() as u64
        );
    }

    /// Property: system gauges never hold out-of-range values regardless of
    /// the sample inputs
    #[test]
    fn system_gauges_are_always_clamped(
        mem_used in any::<u64>(),
        mem_total in any::<u64>(),
        cpu in prop::num::f64::ANY
    ) {
        let store = MetricsStore::new();
        store.record_system_sample(mem_used, mem_total, cpu);

        let gauges = store.system_gauges();
        prop_assert!(gauges.memory_used_bytes <= gauges.memory_total_bytes);
        prop_assert!((0.0..=100.0).contains(&gauges.cpu_load_average));
        prop_assert!((0.0..=1.0).contains(&gauges.memory_used_ratio()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: a breaker never opens before the configured threshold of
    /// consecutive failures, for any interleaving of observations
    #[test]
    fn breaker_opens_only_at_threshold(
        threshold in 1u32..10,
        observations in prop::collection::vec(any::<bool>(), 0..40)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async {
            let breaker = CircuitBreaker::new(
                "dep".to_string(),
                CircuitBreakerSettings {
                    failure_threshold: threshold,
                    reset_timeout_ms: 60_000,
                    transition_check_interval_ms: 1_000,
                },
            );

            let mut consecutive_failures = 0u32;
            for success in &observations {
                if breaker.state() == CircuitState::Open {
                    // With a long reset timeout the breaker must stay open
                    breaker.record_failure().await;
                    prop_assert_eq!(breaker.state(), CircuitState::Open);
                    continue;
                }

                if *success {
                    breaker.record_success().await;
                    consecutive_failures = 0;
                    prop_assert_eq!(breaker.state(), CircuitState::Closed);
                } else {
                    breaker.record_failure().await;
                    consecutive_failures += 1;
                    if consecutive_failures >= threshold {
                        prop_assert_eq!(breaker.state(), CircuitState::Open);
                    } else {
                        prop_assert_eq!(breaker.state(), CircuitState::Closed);
                    }
                }
            }
            Ok(())
        })?;
    }
}
