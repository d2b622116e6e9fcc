//! Error responses in each protocol's shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayError;
use gateway_protocols::{anthropic, gemini, openai_chat};
use tracing::{error, warn};

/// Front-end protocol of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Anthropic Messages
    Anthropic,
    /// OpenAI Chat Completions
    OpenAiChat,
    /// OpenAI Responses
    OpenAiResponses,
    /// Gemini generateContent
    Gemini,
}

impl Protocol {
    /// Name used in logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAiChat => "openai_chat",
            Self::OpenAiResponses => "openai_responses",
            Self::Gemini => "gemini",
        }
    }
}

/// A gateway error bound to the protocol it must be reported in
#[derive(Debug)]
pub struct ApiError {
    protocol: Protocol,
    error: GatewayError,
}

impl ApiError {
    /// Create an API error
    #[must_use]
    pub fn new(protocol: Protocol, error: GatewayError) -> Self {
        Self { protocol, error }
    }

    /// The underlying error
    #[must_use]
    pub fn error(&self) -> &GatewayError {
        &self.error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(protocol = self.protocol.as_str(), status = status.as_u16(), error = %self.error, "Request failed");
        } else {
            warn!(protocol = self.protocol.as_str(), status = status.as_u16(), error = %self.error, "Request rejected");
        }

        match self.protocol {
            Protocol::Anthropic => {
                (status, Json(anthropic::error_response(&self.error))).into_response()
            }
            // The Responses API reports request errors with the chat error body.
            Protocol::OpenAiChat | Protocol::OpenAiResponses => {
                (status, Json(openai_chat::error_response(&self.error))).into_response()
            }
            Protocol::Gemini => (status, Json(gemini::error_response(&self.error))).into_response(),
        }
    }
}
