//! Structured logging and span setup.
//!
//! Installs one global `tracing` subscriber made of:
//! - an `EnvFilter` (`RUST_LOG` wins over the configured level)
//! - a plain or JSON fmt layer
//! - optionally an OpenTelemetry layer so spans carry trace ids

use crate::TelemetryError;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{
    trace::{Config, RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `gateway_routing=debug,info`
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Attach an OpenTelemetry tracer to spans
    pub tracing: bool,
    /// Service name reported on spans
    pub service_name: String,
    /// Deployment environment
    pub environment: String,
    /// Span sampling rate (0.0 - 1.0)
    pub sampling_rate: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            tracing: false,
            service_name: "completion-gateway".to_string(),
            environment: "development".to_string(),
            sampling_rate: 1.0,
        }
    }
}

impl LoggingConfig {
    /// Create a configuration with the given level
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable span export through OpenTelemetry
    #[must_use]
    pub fn with_tracing(mut self, service_name: impl Into<String>) -> Self {
        self.tracing = true;
        self.service_name = service_name.into();
        self
    }

    /// Set the sampling rate
    #[must_use]
    pub fn with_sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    fn sampler(&self) -> Sampler {
        if self.sampling_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sampling_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sampling_rate)
        }
    }
}

/// Install the global subscriber
///
/// Returns the tracer provider when OpenTelemetry is enabled; pass it to
/// [`shutdown_logging`] on exit.
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<Option<TracerProvider>, TelemetryError> {
    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
    };

    let provider = config.tracing.then(|| {
        let resource = Resource::new(vec![
            opentelemetry::KeyValue::new("service.name", config.service_name.clone()),
            opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            opentelemetry::KeyValue::new("deployment.environment", config.environment.clone()),
        ]);
        TracerProvider::builder()
            .with_config(
                Config::default()
                    .with_sampler(config.sampler())
                    .with_id_generator(RandomIdGenerator::default())
                    .with_resource(resource),
            )
            .build()
    });

    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(config.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(config.filter()))
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    info!(
        service = %config.service_name,
        level = %config.level,
        format = ?config.format,
        tracing = config.tracing,
        "Logging initialized"
    );

    Ok(provider)
}

/// Flush and drop the tracer provider
pub fn shutdown_logging(provider: Option<TracerProvider>) {
    if let Some(provider) = provider {
        drop(provider);
        info!("Tracing shutdown complete");
    }
}
