//! # Alert Forwarder and Audit Sink Boundary
//!
//! Best-effort external notification. Significant transitions (breaker
//! opens, maintenance enter/exit, recovery attempts) are delivered to
//! these traits by the event-forwarding loop; implementations own their
//! retry/drop policy and must never propagate failures back into the core
//! state machines, so the trait methods are fire-and-forget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Severity attached to forwarded alerts and audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Delivery of significant state transitions outside the process
/// (email, chat, paging). Fire-and-forget: implementations swallow their
/// own delivery failures.
#[async_trait]
pub trait AlertForwarder: Send + Sync {
    async fn forward(&self, title: &str, message: &str, severity: AlertSeverity);
}

/// Persistent audit trail for operational state transitions
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_system_event(
        &self,
        action: &str,
        details: serde_json::Value,
        severity: AlertSeverity,
    );
}

/// Alert forwarder that writes to the structured log
#[derive(Debug, Default)]
pub struct LogAlertForwarder;

#[async_trait]
impl AlertForwarder for LogAlertForwarder {
    async fn forward(&self, title: &str, message: &str, severity: AlertSeverity) {
        match severity {
            AlertSeverity::Critical => {
                error!(title = title, message = message, "🚨 ALERT")
            }
            AlertSeverity::Warning => warn!(title = title, message = message, "ALERT"),
            AlertSeverity::Info => info!(title = title, message = message, "ALERT"),
        }
    }
}

/// Audit sink that writes to the structured log
#[derive(Debug, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn log_system_event(
        &self,
        action: &str,
        details: serde_json::Value,
        severity: AlertSeverity,
    ) {
        info!(
            action = action,
            severity = ?severity,
            details = %details,
            "AUDIT: system event"
        );
    }
}
