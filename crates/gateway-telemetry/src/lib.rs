//! # Gateway Telemetry
//!
//! Observability for the completion gateway:
//! - `tracing` subscriber setup with optional OpenTelemetry spans
//! - Prometheus completion metrics
//! - [`ObservedCompleter`], which instruments any completer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod observed;

pub use logging::{init_logging, shutdown_logging, LogFormat, LoggingConfig};
pub use metrics::{CompletionMetrics, Outcome};
pub use observed::ObservedCompleter;

/// Telemetry setup error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to install the subscriber
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    /// Failed to build metrics
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
