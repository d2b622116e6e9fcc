//! # Gateway Resilience
//!
//! Failure isolation for the completion gateway:
//! - Per-backend health tracking with a three-state circuit breaker
//! - Bulkhead completer limiting concurrent completions per backend

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bulkhead;
pub mod health;

// Re-export main types
pub use bulkhead::{Bulkhead, BulkheadCompleter, BulkheadConfig, BulkheadPermit};
pub use health::{CircuitState, HealthConfig, HealthSnapshot, InflightGuard, ProviderHealth};
