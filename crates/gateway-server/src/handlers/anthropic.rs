//! `POST /v1/messages`

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
use gateway_protocols::anthropic::{self, AnthropicWriter, MessagesRequest};
use gateway_protocols::{new_id, ResponseMeta};

/// Anthropic Messages endpoint
pub async fn messages(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    handle(&state, &body)
        .await
        .map_err(|e| ApiError::new(Protocol::Anthropic, e))
}

async fn handle(state: &AppState, body: &Bytes) -> GatewayResult<Response> {
    let request: MessagesRequest = parse(body)?;
    let router = state.router(&request.model)?;
    let stream = request.stream;
    let meta = ResponseMeta::new(new_id("msg"), request.model.clone());
    let call = Call::new(router, anthropic::to_completion(request)?, meta);

    if stream {
        call.stream(AnthropicWriter::new()).await
    } else {
        let (meta, result) = call.collect().await?;
        Ok(Json(anthropic::message_response(&meta, &result)).into_response())
    }
}
