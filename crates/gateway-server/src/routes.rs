//! Route definitions for the gateway API.

use crate::handlers::{anthropic, gemini, openai, ops};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Default request body limit
pub const DEFAULT_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Create the main API router
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        // Ops endpoints
        .route("/health", get(ops::health))
        .route("/metrics", get(ops::metrics))
        .route("/admin/backends", get(ops::backends))
        // Completion endpoints
        .route("/v1/models", get(ops::list_models))
        .route("/v1/messages", post(anthropic::messages))
        .route("/v1/chat/completions", post(openai::chat_completions))
        .route("/v1/responses", post(openai::responses))
        .route("/v1beta/models/:target", post(gemini::generate_content))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use gateway_core::{Content, Delta, FinishReason, GatewayError, ToolCall, Usage};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn answer() -> Vec<gateway_core::GatewayResult<Delta>> {
        vec![
            Ok(Delta::text("Hello").with_id("up_1")),
            Ok(Delta::text(" world")),
            Ok(Delta::default()
                .with_reason(FinishReason::Stop)
                .with_usage(Usage::new(4, 2))),
        ]
    }

    fn app(script: Vec<gateway_core::GatewayResult<Delta>>) -> Router {
        create_router(state(script), DEFAULT_BODY_LIMIT)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(if body.is_null() {
                Body::empty()
            } else {
                Body::from(body.to_string())
            })
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn json(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = send(app(answer()), "GET", "/health", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "healthy");
    }

    #[tokio::test]
    async fn test_models_endpoint() {
        let (status, body) = send(app(answer()), "GET", "/v1/models", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["data"][0]["id"], "test-model");
    }

    #[tokio::test]
    async fn test_admin_backends() {
        let (status, body) = send(app(answer()), "GET", "/admin/backends", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body[0]["strategy"], "adaptive");
        assert_eq!(body[0]["backends"][0]["name"], "scripted");
        assert_eq!(body[0]["backends"][0]["state"], "closed");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (status, _) = send(app(answer()), "GET", "/metrics", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1/chat/completions",
            json!({"model": "test-model", "messages": [{"role": "user", "content": "Hi"}]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["choices"][0]["message"]["content"], "Hello world");
        assert_eq!(body["choices"][0]["finish_reason"], "stop");
        assert_eq!(body["usage"]["total_tokens"], 6);
    }

    #[tokio::test]
    async fn test_chat_completion_stream() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1/chat/completions",
            json!({
                "model": "test-model",
                "stream": true,
                "stream_options": {"include_usage": true},
                "messages": [{"role": "user", "content": "Hi"}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""content":"Hello""#));
        assert!(body.contains(r#""total_tokens":6"#));
        assert!(body.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_found() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1/chat/completions",
            json!({"model": "nope", "messages": [{"role": "user", "content": "Hi"}]}),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json(&body)["error"]["message"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/messages")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(answer()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_error_before_output() {
        let script = vec![Err(GatewayError::provider("scripted", "boom", Some(500), true))];
        let (status, body) = send(
            app(script),
            "POST",
            "/v1/messages",
            json!({
                "model": "test-model",
                "max_tokens": 16,
                "stream": true,
                "messages": [{"role": "user", "content": "Hi"}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json(&body)["type"], "error");
    }

    #[tokio::test]
    async fn test_anthropic_stream() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1/messages",
            json!({
                "model": "test-model",
                "max_tokens": 16,
                "stream": true,
                "messages": [{"role": "user", "content": "Hi"}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("event: message_start"));
        assert!(body.contains("event: content_block_delta"));
        assert!(body.contains("event: message_stop"));
    }

    #[tokio::test]
    async fn test_anthropic_message() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1/messages",
            json!({
                "model": "test-model",
                "max_tokens": 16,
                "messages": [{"role": "user", "content": "Hi"}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["content"][0]["text"], "Hello world");
        assert_eq!(body["stop_reason"], "end_turn");
    }

    #[tokio::test]
    async fn test_responses_stream() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1/responses",
            json!({"model": "test-model", "stream": true, "input": "Hi"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("event: response.created"));
        assert!(body.contains("event: response.output_text.delta"));
        assert!(body.contains("event: response.completed"));
    }

    #[tokio::test]
    async fn test_responses_structured_output() {
        let script = vec![
            Ok(Delta::content(Content::ToolCall(ToolCall::new("c1", "answer", "{\"n\":1}")))),
            Ok(Delta::default().with_reason(FinishReason::Tool)),
        ];
        let (status, body) = send(
            app(script),
            "POST",
            "/v1/responses",
            json!({
                "model": "test-model",
                "input": "Count",
                "text": {"format": {"type": "json_schema", "name": "count", "schema": {"type": "object"}}}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["output"][0]["type"], "message");
        assert_eq!(body["output"][0]["content"][0]["text"], "{\"n\":1}");
    }

    #[tokio::test]
    async fn test_gemini_generate() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1beta/models/test-model:generateContent",
            json!({"contents": [{"role": "user", "parts": [{"text": "Hi"}]}]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["candidates"][0]["content"]["parts"][0]["text"], "Hello world");
        assert_eq!(body["candidates"][0]["finishReason"], "STOP");
    }

    #[tokio::test]
    async fn test_gemini_stream_and_unknown_method() {
        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1beta/models/test-model:streamGenerateContent",
            json!({"contents": [{"role": "user", "parts": [{"text": "Hi"}]}]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""finishReason":"STOP""#));

        let (status, body) = send(
            app(answer()),
            "POST",
            "/v1beta/models/test-model:countTokens",
            json!({"contents": []}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"]["status"], "NOT_FOUND");
    }
}
