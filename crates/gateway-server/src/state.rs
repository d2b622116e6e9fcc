//! Shared application state.

use gateway_core::{GatewayError, GatewayResult};
use gateway_routing::Router;
use gateway_telemetry::CompletionMetrics;
use std::sync::Arc;
use std::time::Instant;

/// A model name and the router serving it
#[derive(Clone)]
pub struct ModelRoute {
    /// Name clients request
    pub name: String,
    /// Router over the model's backends
    pub router: Arc<dyn Router>,
}

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    models: Arc<Vec<ModelRoute>>,
    metrics: Arc<CompletionMetrics>,
    started: Instant,
}

impl AppState {
    /// Start building state
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Router for a model name
    ///
    /// # Errors
    /// Returns a not-found error for unknown models
    pub fn router(&self, model: &str) -> GatewayResult<Arc<dyn Router>> {
        self.models
            .iter()
            .find(|m| m.name == model)
            .map(|m| Arc::clone(&m.router))
            .ok_or_else(|| GatewayError::not_found(format!("model '{model}' does not exist")))
    }

    /// All configured models, in configuration order
    #[must_use]
    pub fn models(&self) -> &[ModelRoute] {
        &self.models
    }

    /// Completion metrics
    #[must_use]
    pub fn metrics(&self) -> &CompletionMetrics {
        &self.metrics
    }

    /// Time since startup in seconds
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("models", &self.models.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    models: Vec<ModelRoute>,
    metrics: Option<Arc<CompletionMetrics>>,
}

impl AppStateBuilder {
    /// Add a model route
    #[must_use]
    pub fn model(mut self, name: impl Into<String>, router: Arc<dyn Router>) -> Self {
        self.models.push(ModelRoute {
            name: name.into(),
            router,
        });
        self
    }

    /// Set the metrics registry
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<CompletionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the state
    ///
    /// # Errors
    /// Returns error if no metrics were given and a fresh registry cannot be built
    pub fn build(self) -> GatewayResult<AppState> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(
                CompletionMetrics::new().map_err(|e| GatewayError::internal(e.to_string()))?,
            ),
        };
        Ok(AppState {
            models: Arc::new(self.models),
            metrics,
            started: Instant::now(),
        })
    }
}
