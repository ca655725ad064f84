//! # Metrics Module
//!
//! In-memory operational metrics for the health-orchestration core: a
//! continuously overwritten snapshot of per-dependency counters, system
//! resource gauges and client-connection gauges. Pure data holder -- every
//! other component reads and updates it, nothing here performs I/O.

pub mod sampler;
pub mod store;

pub use sampler::SystemSampler;
pub use store::{
    ConnectionEvent, ConnectionGauges, MetricsSnapshot, MetricsStore, OperationMetrics,
    SystemGauges,
};
