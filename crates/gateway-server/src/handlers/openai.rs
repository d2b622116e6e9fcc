//! `POST /v1/chat/completions` and `POST /v1/responses`

use super::{parse, Call};
use crate::error::{ApiError, Protocol};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::GatewayResult;
use gateway_protocols::openai_chat::{self, ChatCompletionRequest, ChatWriter};
use gateway_protocols::openai_responses::{self, ResponsesRequest, ResponsesWriter};
use gateway_protocols::{new_id, ResponseMeta};

/// OpenAI Chat Completions endpoint
pub async fn chat_completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    chat(&state, &body)
        .await
        .map_err(|e| ApiError::new(Protocol::OpenAiChat, e))
}

async fn chat(state: &AppState, body: &Bytes) -> GatewayResult<Response> {
    let request: ChatCompletionRequest = parse(body)?;
    let router = state.router(&request.model)?;
    let stream = request.stream;
    let include_usage = request.stream_options.as_ref().is_some_and(|o| o.include_usage);
    let meta = ResponseMeta::new(new_id("chatcmpl"), request.model.clone());
    let call = Call::new(router, openai_chat::to_completion(request)?, meta);

    if stream {
        call.stream(ChatWriter::new().with_usage(include_usage)).await
    } else {
        let (meta, result) = call.collect().await?;
        Ok(Json(openai_chat::completion_response(&meta, &result)).into_response())
    }
}

/// OpenAI Responses endpoint
pub async fn responses(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    respond(&state, &body)
        .await
        .map_err(|e| ApiError::new(Protocol::OpenAiResponses, e))
}

async fn respond(state: &AppState, body: &Bytes) -> GatewayResult<Response> {
    let request: ResponsesRequest = parse(body)?;
    let router = state.router(&request.model)?;
    let stream = request.stream;
    let meta = ResponseMeta::new(new_id("resp"), request.model.clone());
    let call = Call::new(router, openai_responses::to_completion(request)?, meta);

    if stream {
        call.stream(ResponsesWriter::new()).await
    } else {
        let (meta, result) = call.collect().await?;
        Ok(Json(openai_responses::response(&meta, &result)).into_response())
    }
}
