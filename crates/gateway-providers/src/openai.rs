//! OpenAI-compatible chat completions backend.
//!
//! Works against any server exposing `POST {base_url}/chat/completions` with
//! OpenAI streaming semantics (OpenAI, Azure-style proxies, vLLM, Ollama,
//! LiteLLM and similar). Requests are always streamed upstream with
//! `stream_options.include_usage` so token counts arrive in the last chunk.

use crate::sse::SseDecoder;
use async_stream::try_stream;
use futures_util::StreamExt;
use gateway_core::{
    CompleteOptions, Completer, Delta, DeltaStream, GatewayError, GatewayResult, Message,
};
use gateway_protocols::openai_chat::convert::{from_messages, from_tools, response_format};
use gateway_protocols::openai_chat::types::{
    ChatCompletionChunk, ChatCompletionRequest, ErrorResponse, StopSequences, StreamOptions,
};
use gateway_protocols::openai_chat::ChunkTranslator;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Backend configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Backend instance id
    pub id: String,
    /// API base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<SecretString>,
    /// Upstream model name
    pub model: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a configuration
    #[must_use]
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Completer backed by an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompleter {
    config: Arc<OpenAiConfig>,
    client: Client,
}

impl OpenAiCompleter {
    /// Create a completer
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(config: OpenAiConfig) -> GatewayResult<Self> {
        url::Url::parse(&config.base_url).map_err(|e| {
            GatewayError::configuration(format!(
                "Invalid base URL '{}' for backend '{}': {e}",
                config.base_url, config.id
            ))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(100)
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Backend instance id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Build the upstream request body
    fn build_request(&self, messages: &[Message], options: &CompleteOptions) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: from_messages(messages),
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            max_tokens: None,
            max_completion_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: (!options.stop.is_empty()).then(|| StopSequences::Many(options.stop.clone())),
            tools: (!options.tools.is_empty()).then(|| from_tools(&options.tools)),
            reasoning_effort: options.effort,
            verbosity: options.verbosity,
            response_format: response_format(options),
        }
    }
}

/// Map an upstream error response
fn parse_error(provider: &str, status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.chars().take(512).collect()
            }
        });
    let retryable = status == 408 || status == 429 || status >= 500;
    GatewayError::provider(provider, message, Some(status), retryable)
}

/// Turn a non-2xx response into an error
async fn check_status(provider: &str, response: reqwest::Response) -> GatewayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(provider = %provider, status = status.as_u16(), "Backend rejected request");
    Err(parse_error(provider, status.as_u16(), &body))
}

/// Parse one event payload; error payloads end the stream
fn parse_event(provider: &str, data: &str) -> GatewayResult<Option<ChatCompletionChunk>> {
    if let Ok(failure) = serde_json::from_str::<ErrorResponse>(data) {
        return Err(GatewayError::provider(provider, failure.error.message, None, false));
    }
    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => Ok(Some(chunk)),
        Err(e) => {
            warn!(provider = %provider, error = %e, "Skipping unparseable chunk");
            Ok(None)
        }
    }
}

fn is_empty(delta: &Delta) -> bool {
    delta.message.is_none() && delta.reason.is_none() && delta.usage.is_none()
}

impl Completer for OpenAiCompleter {
    fn complete(&self, messages: Vec<Message>, options: CompleteOptions) -> DeltaStream {
        let request = self.build_request(&messages, &options);
        let config = Arc::clone(&self.config);
        let client = self.client.clone();

        Box::pin(try_stream! {
            debug!(
                provider = %config.id,
                model = %config.model,
                messages = request.messages.len(),
                "Sending streaming chat completion request"
            );

            let mut builder = client.post(config.completions_url()).json(&request);
            if let Some(key) = config.api_key.as_ref() {
                builder = builder.bearer_auth(key.expose_secret());
            }

            let response = builder.send().await.map_err(|e| {
                error!(provider = %config.id, error = %e, "Chat completion request failed");
                GatewayError::provider(&config.id, format!("Request failed: {e}"), None, true)
            })?;

            let response = check_status(&config.id, response).await?;

            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut translator = ChunkTranslator::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| {
                    GatewayError::provider(&config.id, format!("Stream error: {e}"), None, true)
                })?;

                for data in decoder.push(&chunk) {
                    if data == "[DONE]" {
                        trace!(provider = %config.id, "Stream finished");
                        break 'read;
                    }

                    if let Some(chunk) = parse_event(&config.id, &data)? {
                        let delta = translator.translate(chunk);
                        if !is_empty(&delta) {
                            yield delta;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{complete_to_end, Content, FinishReason, Tool, Usage};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {e}\n\n")).collect()
    }

    async fn completer(server: &MockServer) -> OpenAiCompleter {
        OpenAiCompleter::new(
            OpenAiConfig::new("local", format!("{}/v1", server.uri()), "gpt-test")
                .with_api_key(SecretString::new("sk-test".to_string())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_streams_text_and_usage() {
        let server = MockServer::start().await;
        let body = sse(&[
            r#"{"id":"c1","model":"gpt-test","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
            r#"{"id":"c1","model":"gpt-test","choices":[{"index":0,"delta":{"content":"Hello"}}]}"#,
            r#"{"id":"c1","model":"gpt-test","choices":[{"index":0,"delta":{"content":" world"},"finish_reason":"stop"}]}"#,
            r#"{"id":"c1","model":"gpt-test","choices":[],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
            "[DONE]",
        ]);

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "stream": true,
                "stream_options": {"include_usage": true},
                "messages": [{"role": "user", "content": "Hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let completer = completer(&server).await;
        let result = complete_to_end(&completer, vec![Message::user("Hi")], CompleteOptions::new())
            .await
            .unwrap();

        assert_eq!(result.message.unwrap().text(), "Hello world");
        assert_eq!(result.reason, Some(FinishReason::Stop));
        assert_eq!(result.usage, Some(Usage::new(3, 2)));
        assert_eq!(result.id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_reassembles_tool_calls() {
        let server = MockServer::start().await;
        let body = sse(&[
            r#"{"id":"c2","model":"gpt-test","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"weather","arguments":""}}]}}]}"#,
            r#"{"id":"c2","model":"gpt-test","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":"}}]}}]}"#,
            r#"{"id":"c2","model":"gpt-test","choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"Oslo\"}"}}]},"finish_reason":"tool_calls"}]}"#,
            "[DONE]",
        ]);

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "tools": [{"type": "function", "function": {"name": "weather"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let options = CompleteOptions::new().with_tool(Tool {
            name: "weather".into(),
            description: None,
            parameters: None,
            strict: None,
        });
        let result = complete_to_end(&completer(&server).await, vec![Message::user("Weather?")], options)
            .await
            .unwrap();

        let message = result.message.unwrap();
        let calls = message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "weather");
        assert_eq!(calls[0].arguments, "{\"city\":\"Oslo\"}");
        assert_eq!(result.reason, Some(FinishReason::Tool));
    }

    #[tokio::test]
    async fn test_http_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let err = complete_to_end(&completer(&server).await, vec![Message::user("Hi")], CompleteOptions::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::provider("local", "Rate limit reached", Some(429), true)
        );
    }

    #[tokio::test]
    async fn test_mid_stream_error() {
        let server = MockServer::start().await;
        let body = sse(&[
            r#"{"id":"c3","model":"gpt-test","choices":[{"index":0,"delta":{"content":"par"}}]}"#,
            r#"{"error":{"message":"overloaded","type":"server_error"}}"#,
        ]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let completer = completer(&server).await;
        let items: Vec<_> = completer
            .complete(vec![Message::user("Hi")], CompleteOptions::new())
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().parts(), &[Content::Text("par".into())]);
        assert!(matches!(items[1], Err(GatewayError::Provider { ref message, .. }) if message == "overloaded"));
    }

    #[tokio::test]
    async fn test_no_request_until_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let completer = completer(&server).await;
        let stream = completer.complete(vec![Message::user("Hi")], CompleteOptions::new());
        drop(stream);
        server.verify().await;
    }

    #[test]
    fn test_invalid_base_url() {
        let err = OpenAiCompleter::new(OpenAiConfig::new("bad", "not a url", "m")).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }
}
