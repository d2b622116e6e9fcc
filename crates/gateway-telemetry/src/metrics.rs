//! Prometheus completion metrics.

use gateway_core::Usage;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// How a completion ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stream ran to its end
    Success,
    /// Stream ended with an error
    Error,
    /// Consumer dropped the stream early
    Cancelled,
}

impl Outcome {
    /// Label value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Per-backend completion metrics on a private registry
#[derive(Debug, Clone)]
pub struct CompletionMetrics {
    registry: Registry,
    completions: IntCounterVec,
    time_to_first_token: HistogramVec,
    duration: HistogramVec,
    tokens: IntCounterVec,
}

impl CompletionMetrics {
    /// Create and register all metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let completions = IntCounterVec::new(
            Opts::new("gateway_completions_total", "Completions by backend and outcome"),
            &["backend", "outcome"],
        )?;
        let time_to_first_token = HistogramVec::new(
            HistogramOpts::new(
                "gateway_time_to_first_token_seconds",
                "Time from request to first delta",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["backend"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "gateway_completion_duration_seconds",
                "Time from request to end of stream",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["backend"],
        )?;
        let tokens = IntCounterVec::new(
            Opts::new("gateway_tokens_total", "Tokens by backend and direction"),
            &["backend", "direction"],
        )?;

        registry.register(Box::new(completions.clone()))?;
        registry.register(Box::new(time_to_first_token.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(tokens.clone()))?;

        Ok(Self {
            registry,
            completions,
            time_to_first_token,
            duration,
            tokens,
        })
    }

    /// Record the first delta of a completion
    pub fn observe_first_token(&self, backend: &str, seconds: f64) {
        self.time_to_first_token
            .with_label_values(&[backend])
            .observe(seconds);
    }

    /// Record the end of a completion
    pub fn observe_completion(&self, backend: &str, outcome: Outcome, seconds: f64, usage: Usage) {
        self.completions
            .with_label_values(&[backend, outcome.as_str()])
            .inc();
        self.duration.with_label_values(&[backend]).observe(seconds);
        if usage.input_tokens > 0 {
            self.tokens
                .with_label_values(&[backend, "input"])
                .inc_by(u64::from(usage.input_tokens));
        }
        if usage.output_tokens > 0 {
            self.tokens
                .with_label_values(&[backend, "output"])
                .inc_by(u64::from(usage.output_tokens));
        }
    }

    /// Completions counted so far for a backend and outcome
    #[must_use]
    pub fn completions(&self, backend: &str, outcome: Outcome) -> u64 {
        self.completions
            .with_label_values(&[backend, outcome.as_str()])
            .get()
    }

    /// Render the registry in the Prometheus text format
    #[must_use]
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
