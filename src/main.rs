//! # Completion Gateway
//!
//! Streams LLM completions to Anthropic, OpenAI and Gemini clients from any
//! OpenAI-compatible backend, routing each model across its backends by
//! health and latency.
//!
//! ## Usage
//!
//! ```bash
//! # Start with ./gateway.yaml
//! completion-gateway
//!
//! # Start with a custom config file
//! completion-gateway --config /etc/gateway/gateway.toml
//!
//! # Or through the environment
//! GATEWAY_CONFIG=/etc/gateway/gateway.yaml completion-gateway
//! ```

use clap::Parser;
use gateway_config::{BackendConfig, GatewayConfig};
use gateway_core::{Completer, GatewayError, GatewayResult};
use gateway_providers::{OpenAiCompleter, OpenAiConfig};
use gateway_resilience::{Bulkhead, BulkheadCompleter};
use gateway_routing::{build_router, Backend, Router as _};
use gateway_server::{AppState, Server};
use gateway_telemetry::{init_logging, shutdown_logging, CompletionMetrics, ObservedCompleter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "completion-gateway", version, about)]
struct Args {
    /// Path to the YAML or TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match GatewayConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", args.config.display());
            std::process::exit(1);
        }
    };

    let tracer = match init_logging(&config.logging) {
        Ok(tracer) => tracer,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "Starting completion gateway"
    );

    let result = run(config).await;
    if let Err(e) = &result {
        error!(error = %e, "Gateway failed");
    }

    shutdown_logging(tracer);
    if result.is_err() {
        std::process::exit(1);
    }
}

async fn run(config: GatewayConfig) -> GatewayResult<()> {
    let metrics = Arc::new(
        CompletionMetrics::new().map_err(|e| GatewayError::internal(e.to_string()))?,
    );

    let mut completers = HashMap::with_capacity(config.backends.len());
    for backend in &config.backends {
        completers.insert(backend.id.as_str(), backend_completer(backend, &metrics)?);
    }

    let mut state = AppState::builder().metrics(Arc::clone(&metrics));
    for model in &config.models {
        let backends = model
            .backends
            .iter()
            .map(|id| {
                completers
                    .get(id.as_str())
                    .map(|completer| Backend::new(id.clone(), Arc::clone(completer)))
                    .ok_or_else(|| {
                        GatewayError::configuration(format!(
                            "model '{}' references unknown backend '{id}'",
                            model.name
                        ))
                    })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        let router = build_router(model.strategy, backends, model.health())?;
        info!(
            model = %model.name,
            strategy = router.strategy(),
            backends = model.backends.len(),
            "Model registered"
        );
        state = state.model(model.name.clone(), router);
    }

    Server::new(config.server, state.build()?)
        .run()
        .await
        .map_err(|e| GatewayError::internal(format!("server error: {e}")))
}

/// Upstream client for one backend, behind its bulkhead and metrics
fn backend_completer(
    backend: &BackendConfig,
    metrics: &Arc<CompletionMetrics>,
) -> GatewayResult<Arc<dyn Completer>> {
    let mut upstream = OpenAiConfig::new(&backend.id, &backend.endpoint, &backend.model)
        .with_timeout(backend.timeout);
    if let Some(api_key) = backend.resolve_api_key()? {
        upstream = upstream.with_api_key(api_key);
    }

    let client = Arc::new(OpenAiCompleter::new(upstream)?);
    let bulkheaded = BulkheadCompleter::new(client, Bulkhead::new(&backend.id, backend.bulkhead()));

    info!(
        backend = %backend.id,
        endpoint = %backend.endpoint,
        model = %backend.model,
        max_concurrent = backend.max_concurrent,
        "Backend configured"
    );

    Ok(Arc::new(ObservedCompleter::new(
        backend.id.as_str(),
        Arc::new(bulkheaded),
        Arc::clone(metrics),
    )))
}
