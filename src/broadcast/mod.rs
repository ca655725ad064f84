//! # Client Broadcast Module
//!
//! Fan-out of maintenance-state and error notifications to every live
//! client connection. The broadcaster owns connection-set membership; the
//! transport layer behind each [`ClientSink`] owns the wire.

pub mod broadcaster;

pub use broadcaster::ClientBroadcaster;

use crate::alerts::AlertSeverity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A per-connection send that could not be completed
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// One live client push channel. Implemented by the platform's websocket
/// transport; test doubles implement it in-memory.
#[async_trait]
pub trait ClientSink: Send + Sync {
    /// Deliver one serialized frame to this client
    async fn send(&self, frame: &str) -> Result<(), SinkError>;
}

/// Maintenance banner state pushed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceStatus {
    Active,
    Inactive,
}

/// JSON-shaped events delivered to connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BroadcastEvent {
    Maintenance {
        status: MaintenanceStatus,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    Error {
        code: String,
        message: String,
        severity: AlertSeverity,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl BroadcastEvent {
    pub fn maintenance(status: MaintenanceStatus, message: impl Into<String>) -> Self {
        BroadcastEvent::Maintenance {
            status,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: AlertSeverity,
    ) -> Self {
        BroadcastEvent::Error {
            code: code.into(),
            message: message.into(),
            severity,
            timestamp: chrono::Utc::now(),
        }
    }
}
