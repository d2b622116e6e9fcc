//! `POST /v1beta/models/{model}:generateContent` and `:streamGenerateContent`

use super::{parse, Call};
use crate::error::{ApiError, Protocol};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{GatewayError, GatewayResult};
use gateway_protocols::gemini::{self, GenerateContentRequest, GeminiWriter};
use gateway_protocols::{new_id, ResponseMeta};

/// Gemini endpoint; `target` is `{model}:{method}`
pub async fn generate_content(
    State(state): State<AppState>,
    Path(target): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    handle(&state, &target, &body)
        .await
        .map_err(|e| ApiError::new(Protocol::Gemini, e))
}

async fn handle(state: &AppState, target: &str, body: &Bytes) -> GatewayResult<Response> {
    let (model, method) = target
        .rsplit_once(':')
        .ok_or_else(|| GatewayError::not_found(format!("unknown method for '{target}'")))?;
    let stream = match method {
        "generateContent" => false,
        "streamGenerateContent" => true,
        other => return Err(GatewayError::not_found(format!("unknown method '{other}'"))),
    };

    let request: GenerateContentRequest = parse(body)?;
    let router = state.router(model)?;
    let meta = ResponseMeta::new(new_id("gen"), model);
    let call = Call::new(router, gemini::to_completion(request)?, meta);

    if stream {
        call.stream(GeminiWriter::new()).await
    } else {
        let (meta, result) = call.collect().await?;
        Ok(Json(gemini::response(&meta, &result)).into_response())
    }
}
