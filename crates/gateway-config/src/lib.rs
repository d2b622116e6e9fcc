//! # Gateway Config
//!
//! Loads the gateway configuration from YAML or TOML, expands `${VAR}`
//! references from the environment and validates the result, including the
//! references from model routes to backends.
//!
//! ```yaml
//! server:
//!   port: 8080
//! backends:
//!   - id: vllm-a
//!     endpoint: http://10.0.0.5:8000/v1
//!     model: llama-3-70b
//!   - id: openai
//!     endpoint: https://api.openai.com/v1
//!     api_key: ${OPENAI_API_KEY}
//!     model: gpt-4o
//! models:
//!   - name: chat
//!     strategy: adaptive
//!     backends: [vllm-a, openai]
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{expand_env, expand_env_with, ConfigFormat};
pub use schema::{BackendConfig, CircuitConfig, GatewayConfig, ModelConfig, ServerConfig};
