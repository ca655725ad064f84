//! # Maintenance Mode Module
//!
//! The global switch between normal operation and degraded service. The
//! controller enters maintenance on a fatal trigger or a critical health
//! verdict, attempts a bounded number of automatic recoveries, and exits
//! back to normal on success. After the attempt bound is exhausted the
//! system stays in maintenance pending manual intervention -- a deliberate
//! fail-safe, not a crash.

pub mod controller;

pub use controller::{MaintenanceController, MaintenanceMode, MaintenanceState};
