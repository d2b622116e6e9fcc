//! Configuration schema.

use crate::error::{ConfigError, ConfigResult};
use gateway_resilience::{BulkheadConfig, HealthConfig};
use gateway_routing::RoutingStrategy;
use gateway_telemetry::LoggingConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use validator::Validate;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP server settings
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream backends
    #[validate(length(min = 1, message = "at least one backend is required"), nested)]
    pub backends: Vec<BackendConfig>,

    /// Model routes exposed to clients
    #[validate(length(min = 1, message = "at least one model is required"), nested)]
    pub models: Vec<ModelConfig>,
}

impl GatewayConfig {
    /// Look up a backend by id
    #[must_use]
    pub fn backend(&self, id: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.id == id)
    }

    /// Field checks plus cross-references between sections
    ///
    /// # Errors
    /// Returns the first problem found
    pub fn check(&self) -> ConfigResult<()> {
        self.validate()?;

        let mut ids = HashSet::new();
        for backend in &self.backends {
            if !ids.insert(backend.id.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "backend",
                    name: backend.id.clone(),
                });
            }
            if backend.api_key.is_some() && backend.api_key_env.is_some() {
                return Err(ConfigError::Validation(format!(
                    "backend '{}' sets both api_key and api_key_env",
                    backend.id
                )));
            }
        }

        let mut names = HashSet::new();
        for model in &self.models {
            if !names.insert(model.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "model",
                    name: model.name.clone(),
                });
            }
            if let Some(missing) = model.backends.iter().find(|b| !ids.contains(b.as_str())) {
                return Err(ConfigError::UnknownBackend {
                    model: model.name.clone(),
                    backend: missing.clone(),
                });
            }
        }

        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address
    #[validate(length(min = 1))]
    pub host: String,
    /// Bind port
    #[validate(range(min = 1))]
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Largest accepted request body in bytes
    #[validate(range(min = 1024))]
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: Duration::from_secs(30),
            body_limit: 32 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One upstream OpenAI-compatible endpoint
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Unique backend id
    #[validate(length(min = 1))]
    pub id: String,
    /// API base URL
    #[validate(url)]
    pub endpoint: String,
    /// Inline API key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Upstream model name
    #[validate(length(min = 1))]
    pub model: String,
    /// Concurrent completions allowed
    #[serde(default = "default_max_concurrent")]
    #[validate(range(min = 1))]
    pub max_concurrent: u32,
    /// How long a completion may wait for a slot
    #[serde(default = "default_queue_timeout", with = "humantime_serde")]
    pub queue_timeout: Duration,
    /// Whole-request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_max_concurrent() -> u32 {
    64
}

fn default_queue_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

impl BackendConfig {
    /// Resolve the API key
    ///
    /// # Errors
    /// Returns an error if `api_key_env` names an unset variable
    pub fn resolve_api_key(&self) -> ConfigResult<Option<SecretString>> {
        if let Some(key) = &self.api_key {
            return Ok(Some(key.clone()));
        }
        match &self.api_key_env {
            Some(var) => std::env::var(var)
                .map(|v| Some(SecretString::new(v)))
                .map_err(|_| ConfigError::MissingEnv(var.clone())),
            None => Ok(None),
        }
    }

    /// Concurrency limits
    #[must_use]
    pub fn bulkhead(&self) -> BulkheadConfig {
        BulkheadConfig {
            max_concurrent: self.max_concurrent,
            queue_timeout: self.queue_timeout,
        }
    }
}

/// A model name clients can request, routed over a set of backends
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Name clients send in requests
    #[validate(length(min = 1))]
    pub name: String,
    /// Load balancing strategy
    #[serde(default)]
    pub strategy: RoutingStrategy,
    /// Backend ids
    #[validate(length(min = 1, message = "a model needs at least one backend"))]
    pub backends: Vec<String>,
    /// Circuit breaker settings
    #[serde(default)]
    #[validate(nested)]
    pub circuit: CircuitConfig,
}

/// Circuit breaker settings
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens
    #[validate(range(min = 1))]
    pub failure_threshold: u32,
    /// Time an open circuit waits before allowing a probe
    #[serde(with = "humantime_serde")]
    pub recovery_timeout: Duration,
    /// Smoothing factor of the latency moving average
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub latency_alpha: f64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        let health = HealthConfig::default();
        Self {
            failure_threshold: health.failure_threshold,
            recovery_timeout: health.recovery_timeout,
            latency_alpha: health.latency_alpha,
        }
    }
}

impl ModelConfig {
    /// Health tracker settings for this route
    #[must_use]
    pub fn health(&self) -> HealthConfig {
        HealthConfig {
            failure_threshold: self.circuit.failure_threshold,
            recovery_timeout: self.circuit.recovery_timeout,
            latency_alpha: self.circuit.latency_alpha,
        }
    }
}
