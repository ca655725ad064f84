//! # System Resource Sampler
//!
//! Best-effort detection of host memory and CPU utilization, feeding the
//! system gauges in the metrics store on the metrics-sample tick. Detection
//! accuracy varies by platform; the gauges are used for pressure
//! classification, not for enforcement.

use crate::metrics::MetricsStore;
use parking_lot::Mutex;
use std::sync::Arc;
use sysinfo::System;
use tracing::debug;

/// Periodic sampler for the system resource gauges
pub struct SystemSampler {
    system: Mutex<System>,
    metrics: Arc<MetricsStore>,
}

impl SystemSampler {
    pub fn new(metrics: Arc<MetricsStore>) -> Self {
        Self {
            system: Mutex::new(System::new()),
            metrics,
        }
    }

    /// Take one sample and overwrite the system gauges.
    ///
    /// CPU utilization needs two refreshes to produce a meaningful delta, so
    /// the first sample after startup reports zero CPU load.
    pub fn sample(&self) {
        let (mem_used, mem_total, cpu_load) = {
            let mut system = self.system.lock();
            system.refresh_memory();
            system.refresh_cpu_usage();

            let cpu_load = f64::from(system.global_cpu_info().cpu_usage());
            (system.used_memory(), system.total_memory(), cpu_load)
        };

        debug!(
            memory_used_bytes = mem_used,
            memory_total_bytes = mem_total,
            cpu_load = cpu_load,
            "System resource sample taken"
        );

        self.metrics
            .record_system_sample(mem_used, mem_total, cpu_load);
    }
}
