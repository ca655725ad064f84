//! # Resilience Module
//!
//! Fault isolation for the platform's remote dependencies. Each monitored
//! dependency gets its own circuit breaker following the classic pattern
//! with three states: Closed (normal operation), Open (failing fast), and
//! Half-Open (testing recovery). Breakers never share state; transitions on
//! a single breaker are totally ordered.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use congregate_core::config::CircuitBreakerSettings;
//! use congregate_core::resilience::CircuitBreaker;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = CircuitBreaker::new("cache".to_string(), CircuitBreakerSettings::default());
//!
//! let result = breaker
//!     .call(|| async {
//!         // Remote cache round trip here
//!         Ok::<&str, Box<dyn std::error::Error>>("PONG")
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod manager;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerError, CircuitBreakerSnapshot, CircuitState,
};
pub use manager::CircuitBreakerManager;
