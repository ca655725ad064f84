//! # Orchestration Module
//!
//! The dependency-injected context object that wires the health
//! orchestration subsystem together and drives its periodic loops. There
//! is no implicit global state: construct an [`OrchestrationCore`] per
//! process (or per test) and every component hangs off it.

pub mod core;

pub use core::OrchestrationCore;
