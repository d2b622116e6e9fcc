//! Error types for the gateway.
//!
//! Errors fall into three groups: backend failures (which count against a
//! backend's health), pool exhaustion, and protocol translation problems
//! (which never reach a backend).

use thiserror::Error;

/// Result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while serving a completion
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport or logic error raised by a backend
    #[error("Provider {provider} error: {message}")]
    Provider {
        /// Backend name
        provider: String,
        /// Error message
        message: String,
        /// Upstream HTTP status, when there was one
        status_code: Option<u16>,
        /// Whether the caller may retry against another backend
        retryable: bool,
    },

    /// No backend could be selected
    #[error("No backend available: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },

    /// The requested model is not served
    #[error("Not found: {message}")]
    NotFound {
        /// Error message
        message: String,
    },

    /// A client request could not be expressed as messages and options
    #[error("Translation error: {message}")]
    Translation {
        /// Error message
        message: String,
        /// Offending request field
        field: Option<String>,
        /// Machine-readable code
        code: String,
    },

    /// Invalid configuration or construction arguments
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Anything else
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create a provider error
    pub fn provider(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        retryable: bool,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a translation error
    pub fn translation(
        message: impl Into<String>,
        field: Option<&str>,
        code: impl Into<String>,
    ) -> Self {
        Self::Translation {
            message: message.into(),
            field: field.map(str::to_string),
            code: code.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying elsewhere could help
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Unavailable { .. } => true,
            Self::NotFound { .. }
            | Self::Translation { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// HTTP status the server answers with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Provider {
                status_code: Some(status),
                ..
            } if (400..500).contains(status) && *status != 408 && *status != 429 => *status,
            Self::Provider { .. } => 502,
            Self::Unavailable { .. } => 503,
            Self::NotFound { .. } => 404,
            Self::Translation { .. } => 400,
            Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Short error type string used in protocol error bodies
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "provider_error",
            Self::Unavailable { .. } => "overloaded_error",
            Self::NotFound { .. } => "not_found_error",
            Self::Translation { .. } => "invalid_request_error",
            Self::Configuration { .. } | Self::Internal { .. } => "api_error",
        }
    }

    /// Error message without the category prefix
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Unavailable { message }
            | Self::NotFound { message }
            | Self::Translation { message, .. }
            | Self::Configuration { message }
            | Self::Internal { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::translation("bad", None, "x").status_code(), 400);
        assert_eq!(GatewayError::unavailable("none").status_code(), 503);
        assert_eq!(GatewayError::not_found("model 'x'").status_code(), 404);
        assert_eq!(
            GatewayError::provider("a", "boom", Some(500), true).status_code(),
            502
        );
        assert_eq!(
            GatewayError::provider("a", "nope", Some(401), false).status_code(),
            401
        );
        assert_eq!(
            GatewayError::provider("a", "slow down", Some(429), true).status_code(),
            502
        );
    }

    #[test]
    fn test_retryable() {
        assert!(GatewayError::provider("a", "x", None, true).is_retryable());
        assert!(!GatewayError::translation("x", Some("messages"), "bad").is_retryable());
    }

    #[test]
    fn test_constructors_fill_named_fields() {
        match GatewayError::translation("bad tool", Some("tools[0]"), "invalid_tool") {
            GatewayError::Translation { message, field, code } => {
                assert_eq!(message, "bad tool");
                assert_eq!(field.as_deref(), Some("tools[0]"));
                assert_eq!(code, "invalid_tool");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(matches!(
            GatewayError::configuration("no backends"),
            GatewayError::Configuration { ref message } if message == "no backends"
        ));
        assert!(matches!(
            GatewayError::internal("oops"),
            GatewayError::Internal { ref message } if message == "oops"
        ));
        assert_eq!(GatewayError::configuration("no backends").message(), "no backends");
        assert_eq!(GatewayError::internal("oops").to_string(), "Internal error: oops");
    }

    #[test]
    fn test_display() {
        let err = GatewayError::provider("openai", "connection reset", None, true);
        assert_eq!(err.to_string(), "Provider openai error: connection reset");
        assert_eq!(err.message(), "connection reset");
    }
}
