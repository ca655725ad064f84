#![allow(clippy::doc_markdown)] // Allow technical terms like WebSocket, JSON in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Congregate Core
//!
//! Rust implementation of the service health orchestration backbone for the
//! Congregate community platform.
//!
//! ## Overview
//!
//! The core tracks the health of the platform's dependencies (remote
//! cache/pub-sub store, request pipeline, live notification channel),
//! decides when the whole service should declare itself degraded
//! (maintenance mode), attempts bounded automatic recovery, and pushes the
//! resulting state to every connected client in real time. The platform's
//! CRUD handlers, persistence and auth layers are external collaborators
//! consumed through the trait seams in [`health`], [`alerts`] and
//! [`broadcast`].
//!
//! ## Module Organization
//!
//! - [`metrics`] - In-memory metrics store and system resource sampler
//! - [`resilience`] - Per-dependency circuit breakers
//! - [`health`] - Dependency probes and the health check scheduler
//! - [`maintenance`] - Maintenance-mode state machine with bounded recovery
//! - [`broadcast`] - Live client notification fan-out
//! - [`alerts`] - Best-effort alert forwarder / audit sink boundary
//! - [`events`] - Typed transition event channel
//! - [`orchestration`] - Context object wiring and periodic loops
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use congregate_core::alerts::{LogAlertForwarder, LogAuditSink};
//! use congregate_core::config::OrchestrationConfig;
//! use congregate_core::orchestration::OrchestrationCore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let core = OrchestrationCore::new(
//!     OrchestrationConfig::default(),
//!     Arc::new(LogAlertForwarder),
//!     Arc::new(LogAuditSink),
//! );
//!
//! core.start().await;
//! // ... register probes, accept client connections ...
//! core.stop().await;
//! # }
//! ```

pub mod alerts;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod logging;
pub mod maintenance;
pub mod metrics;
pub mod orchestration;
pub mod resilience;

pub use config::{ConfigManager, OrchestrationConfig};
pub use error::{CongregateError, Result};
pub use health::{HealthCheckResult, HealthReport, HealthStatus};
pub use maintenance::{MaintenanceMode, MaintenanceState};
pub use metrics::{MetricsSnapshot, MetricsStore};
pub use orchestration::OrchestrationCore;
pub use resilience::{CircuitBreaker, CircuitState};
