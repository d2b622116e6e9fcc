//! Reading configuration files.

use crate::error::{ConfigError, ConfigResult};
use crate::schema::GatewayConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// `${NAME}` or `${NAME:-default}`
static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap());

/// Source format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML
    Yaml,
    /// TOML
    Toml,
}

impl ConfigFormat {
    /// Guess the format from a file extension; YAML unless `.toml`
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Replace `${VAR}` references using `lookup`
///
/// Lines starting with `#` are left untouched so commented-out settings
/// never require their variables.
///
/// # Errors
/// Returns [`ConfigError::MissingEnv`] for an unset variable without default
pub fn expand_env_with<F>(input: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());

    for line in input.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            out.push_str(line);
            continue;
        }

        let mut last = 0;
        for caps in ENV_VAR.captures_iter(line) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&line[last..whole.start()]);
            let value = lookup(name.as_str())
                .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
                .ok_or_else(|| ConfigError::MissingEnv(name.as_str().to_string()))?;
            out.push_str(&value);
            last = whole.end();
        }
        out.push_str(&line[last..]);
    }

    Ok(out)
}

/// Replace `${VAR}` references from the process environment
///
/// # Errors
/// Returns [`ConfigError::MissingEnv`] for an unset variable without default
pub fn expand_env(input: &str) -> ConfigResult<String> {
    expand_env_with(input, |name| std::env::var(name).ok())
}

impl GatewayConfig {
    /// Parse, expand and check configuration text
    ///
    /// # Errors
    /// Returns error if the text is malformed or fails validation
    pub fn parse(input: &str, format: ConfigFormat) -> ConfigResult<Self> {
        let expanded = expand_env(input)?;
        let config: Self = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(&expanded)?,
            ConfigFormat::Toml => toml::from_str(&expanded)?,
        };
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading configuration");

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, ConfigFormat::from_path(path))?;

        info!(
            path = %path.display(),
            backends = config.backends.len(),
            models = config.models.len(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_routing::RoutingStrategy;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use std::time::Duration;

    const YAML: &str = r#"
server:
  port: 9000
logging:
  format: json
backends:
  - id: local
    endpoint: http://localhost:8000/v1
    model: llama-3
    api_key: secret
    timeout: 2m
  - id: remote
    endpoint: https://api.example.com/v1
    model: gpt-4o
    max_concurrent: 8
models:
  - name: default
    strategy: round_robin
    backends: [local, remote]
    circuit:
      failure_threshold: 3
      recovery_timeout: 15s
"#;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HOST" => Some("example.com".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_env() {
        let out = expand_env_with("url: https://${HOST}/v1 port: ${PORT:-8080}", lookup).unwrap();
        assert_eq!(out, "url: https://example.com/v1 port: 8080");
    }

    #[test]
    fn test_expand_env_missing() {
        let err = expand_env_with("key: ${NOPE}", lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref v) if v == "NOPE"));
    }

    #[test]
    fn test_expand_env_skips_comments() {
        let out = expand_env_with("# key: ${NOPE}\nhost: ${HOST}\n", lookup).unwrap();
        assert_eq!(out, "# key: ${NOPE}\nhost: example.com\n");
    }

    #[test]
    fn test_parse_yaml() {
        let config = GatewayConfig::parse(YAML, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, gateway_telemetry::LogFormat::Json);

        let local = config.backend("local").unwrap();
        assert_eq!(local.timeout, Duration::from_secs(120));
        assert_eq!(local.max_concurrent, 64);
        assert_eq!(
            local.resolve_api_key().unwrap().unwrap().expose_secret(),
            "secret"
        );
        assert_eq!(config.backend("remote").unwrap().bulkhead().max_concurrent, 8);

        let model = &config.models[0];
        assert_eq!(model.strategy, RoutingStrategy::RoundRobin);
        let health = model.health();
        assert_eq!(health.failure_threshold, 3);
        assert_eq!(health.recovery_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_unknown_backend() {
        let yaml = YAML.replace("[local, remote]", "[local, missing]");
        let err = GatewayConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownBackend { ref model, ref backend } if model == "default" && backend == "missing"
        ));
    }

    #[test]
    fn test_duplicate_backend() {
        let yaml = YAML.replace("id: remote", "id: local");
        let err = GatewayConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Duplicate { kind: "backend", .. }));
    }

    #[test]
    fn test_invalid_endpoint() {
        let yaml = YAML.replace("http://localhost:8000/v1", "not a url");
        let err = GatewayConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_api_key_env() {
        let yaml = YAML.replace(
            "max_concurrent: 8",
            "max_concurrent: 8\n    api_key_env: GATEWAY_TEST_UNSET_KEY_VAR",
        );
        let config = GatewayConfig::parse(&yaml, ConfigFormat::Yaml).unwrap();
        let err = config.backend("remote").unwrap().resolve_api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(_)));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[[backends]]
id = "local"
endpoint = "http://localhost:11434/v1"
model = "qwen"

[[models]]
name = "qwen"
backends = ["local"]
"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.models[0].strategy, RoutingStrategy::Adaptive);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_load_missing_file() {
        let err = GatewayConfig::load("/nonexistent/gateway.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
