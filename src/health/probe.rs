//! Dependency probe seam
//!
//! Each monitored dependency exposes a zero/low-cost liveness call (a ping
//! to the remote cache/pub-sub store, a round-trip auth check). The
//! scheduler measures latency around the call and bounds it with an
//! explicit timeout, so implementations only report success or failure.

use async_trait::async_trait;

/// A probe round trip that did not complete correctly
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct ProbeFailure {
    pub reason: String,
}

impl ProbeFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Lightweight liveness check against one dependency
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Perform one liveness round trip. Implementations should not apply
    /// their own retry policy; the scheduler owns timing and classification.
    async fn probe(&self) -> Result<(), ProbeFailure>;
}
