//! Shared test doubles for the orchestration integration tests

use async_trait::async_trait;
use congregate_core::alerts::{AlertForwarder, AlertSeverity, AuditSink};
use congregate_core::broadcast::{ClientSink, SinkError};
use congregate_core::health::{DependencyProbe, ProbeFailure};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Probe whose outcome can be flipped at runtime
pub struct SwitchableProbe {
    healthy: AtomicBool,
    pub calls: AtomicUsize,
}

impl SwitchableProbe {
    pub fn new(healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(healthy),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl DependencyProbe for SwitchableProbe {
    async fn probe(&self) -> Result<(), ProbeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProbeFailure::new("connection refused"))
        }
    }
}

/// In-memory client sink capturing every delivered frame
pub struct CaptureSink {
    pub frames: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        })
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }
}

#[async_trait]
impl ClientSink for CaptureSink {
    async fn send(&self, frame: &str) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.frames.lock().push(frame.to_string());
        Ok(())
    }
}

/// Alert forwarder recording every forwarded alert
#[derive(Default)]
pub struct RecordingAlertForwarder {
    pub alerts: Mutex<Vec<(String, String, AlertSeverity)>>,
}

impl RecordingAlertForwarder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn titles(&self) -> Vec<String> {
        self.alerts.lock().iter().map(|(t, _, _)| t.clone()).collect()
    }
}

#[async_trait]
impl AlertForwarder for RecordingAlertForwarder {
    async fn forward(&self, title: &str, message: &str, severity: AlertSeverity) {
        self.alerts
            .lock()
            .push((title.to_string(), message.to_string(), severity));
    }
}

/// Audit sink recording every logged action
#[derive(Default)]
pub struct RecordingAuditSink {
    pub events: Mutex<Vec<(String, AlertSeverity)>>,
}

impl RecordingAuditSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn actions(&self) -> Vec<String> {
        self.events.lock().iter().map(|(a, _)| a.clone()).collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn log_system_event(
        &self,
        action: &str,
        _details: serde_json::Value,
        severity: AlertSeverity,
    ) {
        self.events.lock().push((action.to_string(), severity));
    }
}
