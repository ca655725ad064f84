//! # Metrics Store
//!
//! Process-wide, continuously overwritten snapshot of counters and gauges.
//! All updates are in-memory and non-blocking; malformed inputs are clamped
//! rather than rejected so metric recording can never crash the process.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one monitored dependency
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationMetrics {
    /// Total operations observed
    pub count: u64,

    /// Failed operations observed
    pub error_count: u64,

    /// Incrementally maintained mean latency in milliseconds
    pub rolling_avg_latency_ms: f64,
}

/// System resource gauges, overwritten on every sample
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemGauges {
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,

    /// Global CPU utilization as a 0-100 percentage
    pub cpu_load_average: f64,
}

impl SystemGauges {
    /// Memory-used ratio (0.0 - 1.0); zero when no sample has been taken
    pub fn memory_used_ratio(&self) -> f64 {
        if self.memory_total_bytes == 0 {
            return 0.0;
        }
        self.memory_used_bytes as f64 / self.memory_total_bytes as f64
    }
}

/// Client-connection gauges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionGauges {
    pub active_connections: u64,
    pub total_disconnects: u64,
    pub last_disconnect_reason: Option<String>,
}

/// Connection lifecycle event reported by the broadcaster / transport layer
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { code: Option<u16>, reason: String },
}

/// Immutable copy of the current metrics state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub operations: HashMap<String, OperationMetrics>,
    pub system: SystemGauges,
    pub connections: ConnectionGauges,
    pub collected_at: chrono::DateTime<chrono::Utc>,
}

/// In-memory metrics store shared by all components
#[derive(Debug, Default)]
pub struct MetricsStore {
    operations: DashMap<String, OperationMetrics>,
    system: RwLock<SystemGauges>,
    connections: RwLock<ConnectionGauges>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one operation outcome for a dependency. Updates the rolling
    /// mean latency incrementally and bumps the error counter on failure.
    /// Negative or non-finite latencies are clamped to zero.
    pub fn record_operation(&self, dependency: &str, success: bool, latency_ms: f64) {
        let latency_ms = if latency_ms.is_finite() {
            latency_ms.max(0.0)
        } else {
            0.0
        };

        let mut entry = self
            .operations
            .entry(dependency.to_string())
            .or_default();
        entry.count += 1;
        if !success {
            entry.error_count += 1;
        }
        entry.rolling_avg_latency_ms +=
            (latency_ms - entry.rolling_avg_latency_ms) / entry.count as f64;
    }

    /// Overwrite the system resource gauges with a fresh sample. Inputs are
    /// clamped: used memory never exceeds total, CPU load is forced into
    /// 0-100 and non-finite values become zero.
    pub fn record_system_sample(&self, mem_used: u64, mem_total: u64, cpu_load: f64) {
        let cpu_load = if cpu_load.is_finite() {
            cpu_load.clamp(0.0, 100.0)
        } else {
            0.0
        };

        let mut gauges = self.system.write();
        gauges.memory_total_bytes = mem_total;
        gauges.memory_used_bytes = mem_used.min(mem_total);
        gauges.cpu_load_average = cpu_load;
    }

    /// Update the connection gauges from a lifecycle event
    pub fn record_connection_event(&self, event: ConnectionEvent) {
        let mut gauges = self.connections.write();
        match event {
            ConnectionEvent::Connected => {
                gauges.active_connections += 1;
            }
            ConnectionEvent::Disconnected { code, reason } => {
                gauges.active_connections = gauges.active_connections.saturating_sub(1);
                gauges.total_disconnects += 1;
                gauges.last_disconnect_reason = Some(match code {
                    Some(code) => format!("{code}: {reason}"),
                    None => reason,
                });
            }
        }
    }

    /// Current system gauges (cheap copy, used by the health scheduler)
    pub fn system_gauges(&self) -> SystemGauges {
        self.system.read().clone()
    }

    /// Current connection gauges
    pub fn connection_gauges(&self) -> ConnectionGauges {
        self.connections.read().clone()
    }

    /// Immutable copy of the full metrics state for external reporting
    pub fn snapshot(&self) -> MetricsSnapshot {
        let operations = self
            .operations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        MetricsSnapshot {
            operations,
            system: self.system.read().clone(),
            connections: self.connections.read().clone(),
            collected_at: chrono::Utc::now(),
        }
    }
}
