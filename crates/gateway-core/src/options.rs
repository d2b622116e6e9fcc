//! Per-request generation options.

use crate::delta::Delta;
use crate::error::{GatewayError, GatewayResult};
use crate::message::Tool;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Callback invoked for every streamed delta
pub type StreamHandler = Arc<dyn Fn(&Delta) -> GatewayResult<()> + Send + Sync>;

/// Reasoning effort hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    /// Minimal reasoning
    Minimal,
    /// Low effort
    Low,
    /// Medium effort
    Medium,
    /// High effort
    High,
}

/// Output verbosity hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Terse
    Low,
    /// Balanced
    Medium,
    /// Verbose
    High,
}

/// Output format constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Any JSON object
    Json,
}

/// JSON schema the output must follow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name
    pub name: String,
    /// Schema description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the schema must be followed exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    /// The JSON schema itself
    pub schema: serde_json::Value,
}

/// Options accompanying a completion request
#[derive(Clone, Default)]
pub struct CompleteOptions {
    /// Per-delta callback; absent for callers that only want the final result
    pub stream: Option<StreamHandler>,
    /// Reasoning effort
    pub effort: Option<Effort>,
    /// Output verbosity
    pub verbosity: Option<Verbosity>,
    /// Stop sequences
    pub stop: Vec<String>,
    /// Tools the model may call
    pub tools: Vec<Tool>,
    /// Output token limit
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Output format
    pub format: Option<Format>,
    /// Output schema
    pub schema: Option<Schema>,
}

impl fmt::Debug for CompleteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompleteOptions")
            .field("stream", &self.stream.is_some())
            .field("effort", &self.effort)
            .field("verbosity", &self.verbosity)
            .field("stop", &self.stop)
            .field("tools", &self.tools.len())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("format", &self.format)
            .field("schema", &self.schema.as_ref().map(|s| &s.name))
            .finish()
    }
}

impl CompleteOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stream callback
    #[must_use]
    pub fn with_stream<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Delta) -> GatewayResult<()> + Send + Sync + 'static,
    {
        self.stream = Some(Arc::new(handler));
        self
    }

    /// Set the reasoning effort
    #[must_use]
    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = Some(effort);
        self
    }

    /// Set the verbosity
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Add a stop sequence
    #[must_use]
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    /// Add a tool
    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set the output token limit
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the output schema
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validate option ranges
    ///
    /// # Errors
    /// Returns a translation error naming the offending field
    pub fn validate(&self) -> GatewayResult<()> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(GatewayError::translation(
                    format!("temperature must be between 0 and 2, got {temperature}"),
                    Some("temperature"),
                    "invalid_temperature",
                ));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(GatewayError::translation(
                "max_tokens must be greater than zero",
                Some("max_tokens"),
                "invalid_max_tokens",
            ));
        }
        for tool in &self.tools {
            if tool.name.is_empty() {
                return Err(GatewayError::translation(
                    "tool name cannot be empty",
                    Some("tools"),
                    "invalid_tool",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ranges() {
        assert!(CompleteOptions::new().with_temperature(0.7).validate().is_ok());

        let err = CompleteOptions::new().with_temperature(3.5).validate().unwrap_err();
        assert!(matches!(err, GatewayError::Translation { field: Some(ref f), .. } if f == "temperature"));

        assert!(CompleteOptions::new().with_max_tokens(0).validate().is_err());
    }

    #[test]
    fn test_debug_hides_handler() {
        let options = CompleteOptions::new().with_stream(|_| Ok(())).with_stop("END");
        let debug = format!("{options:?}");
        assert!(debug.contains("stream: true"));
        assert!(debug.contains("END"));
    }
}
