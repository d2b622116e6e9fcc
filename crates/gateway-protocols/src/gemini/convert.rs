//! Translation between Gemini contents and gateway messages.

use super::types::{
    ApiError, Candidate, Content as GeminiContent, ErrorResponse, FunctionCall,
    GenerateContentRequest, GenerateContentResponse, Part, UsageMetadata,
};
use crate::convert::{arguments_value, decode_base64, file_from_url};
use crate::emitter::ResponseMeta;
use gateway_core::{
    CompleteOptions, Content, Delta, Effort, File, FinishReason, Format, GatewayError,
    GatewayResult, Message, Reasoning, Role, Schema, Tool, ToolCall, ToolResult, Usage,
};

/// Convert a request into conversation history and options
///
/// # Errors
/// Returns a translation error for content the gateway cannot represent
pub fn to_completion(
    request: GenerateContentRequest,
) -> GatewayResult<(Vec<Message>, CompleteOptions)> {
    let mut messages = Vec::with_capacity(request.contents.len() + 1);

    if let Some(system) = request.system_instruction {
        let text = system
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if !text.is_empty() {
            messages.push(Message::system(text));
        }
    }

    for (i, turn) in request.contents.into_iter().enumerate() {
        let field = format!("contents[{i}]");
        let role = if turn.role == "model" {
            Role::Assistant
        } else {
            Role::User
        };

        let mut content = Vec::with_capacity(turn.parts.len());
        for mut part in turn.parts {
            if let Some(response) = part.function_response.take() {
                let id = response.id.unwrap_or(response.name);
                messages.push(Message::new(
                    Role::Tool,
                    vec![Content::ToolResult(ToolResult {
                        id,
                        data: response.response.to_string(),
                    })],
                ));
                continue;
            }
            content.extend(convert_part(part, &field)?);
        }

        if !content.is_empty() {
            messages.push(Message::new(role, content));
        }
    }

    let mut options = CompleteOptions::new();
    options.tools = request
        .tools
        .into_iter()
        .flat_map(|t| t.function_declarations)
        .map(|f| Tool {
            name: f.name,
            description: f.description,
            parameters: f.parameters.or(f.parameters_json_schema),
            strict: None,
        })
        .collect();

    if let Some(config) = request.generation_config {
        options.stop = config.stop_sequences;
        options.temperature = config.temperature;
        options.max_tokens = config.max_output_tokens;

        if let Some(schema) = config.response_json_schema.or(config.response_schema) {
            options.schema = Some(Schema {
                name: "response".to_string(),
                description: None,
                strict: None,
                schema,
            });
        } else if config.response_mime_type.as_deref() == Some("application/json") {
            options.format = Some(Format::Json);
        }

        options.effort = config
            .thinking_config
            .and_then(|t| t.thinking_budget)
            .and_then(|budget| match budget {
                0 => None,
                1..=1024 => Some(Effort::Low),
                1025..=8192 => Some(Effort::Medium),
                // -1 asks the model to pick its own budget
                b if b < 0 => Some(Effort::Medium),
                _ => Some(Effort::High),
            });
    }

    options.validate()?;
    Ok((messages, options))
}

fn convert_part(part: Part, field: &str) -> GatewayResult<Option<Content>> {
    if let Some(call) = part.function_call {
        let id = call.id.unwrap_or_else(|| call.name.clone());
        let arguments = if call.args.is_null() {
            "{}".to_string()
        } else {
            call.args.to_string()
        };
        return Ok(Some(Content::ToolCall(ToolCall::new(id, call.name, arguments))));
    }
    if let Some(blob) = part.inline_data {
        return Ok(Some(Content::File(File {
            name: None,
            content_type: blob.mime_type,
            content: decode_base64(&blob.data, format!("{field}.inlineData").as_str())?,
        })));
    }
    if let Some(file) = part.file_data {
        let mut converted = file_from_url(&file.file_uri, None, format!("{field}.fileData").as_str())?;
        if let Some(mime_type) = file.mime_type {
            converted.content_type = mime_type;
        }
        return Ok(Some(Content::File(converted)));
    }
    match part.text {
        Some(text) if part.thought == Some(true) => Ok(Some(Content::Reasoning(Reasoning {
            text,
            signature: part.thought_signature.unwrap_or_default(),
            ..Reasoning::default()
        }))),
        Some(text) if !text.is_empty() => Ok(Some(Content::Text(text))),
        _ => Ok(None),
    }
}

/// Map a termination reason to a Gemini finish reason
#[must_use]
pub fn finish_reason(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop | FinishReason::Tool => "STOP",
        FinishReason::Length => "MAX_TOKENS",
        FinishReason::Filter => "SAFETY",
    }
}

pub(crate) fn usage_metadata(usage: Usage) -> UsageMetadata {
    UsageMetadata {
        prompt_token_count: usage.input_tokens,
        candidates_token_count: usage.output_tokens,
        total_token_count: usage.total(),
    }
}

pub(crate) fn function_call_part(call: &ToolCall) -> Part {
    Part {
        function_call: Some(FunctionCall {
            id: (!call.id.is_empty()).then(|| call.id.clone()),
            name: call.name.clone(),
            args: arguments_value(&call.arguments),
        }),
        ..Part::default()
    }
}

pub(crate) fn thought_part(text: &str, signature: &str) -> Part {
    Part {
        text: Some(text.to_string()),
        thought: Some(true),
        thought_signature: (!signature.is_empty()).then(|| signature.to_string()),
        ..Part::default()
    }
}

/// Build a non-streaming response from an accumulated result
#[must_use]
pub fn response(meta: &ResponseMeta, result: &Delta) -> GenerateContentResponse {
    let mut parts = Vec::new();
    let mut has_tool = false;

    for part in result.parts() {
        match part {
            Content::Reasoning(r) => parts.push(thought_part(
                if r.text.is_empty() { &r.summary } else { &r.text },
                &r.signature,
            )),
            Content::Text(text) | Content::Refusal(text) => parts.push(Part {
                text: Some(text.clone()),
                ..Part::default()
            }),
            Content::ToolCall(call) => {
                has_tool = true;
                parts.push(function_call_part(call));
            }
            Content::File(_) | Content::ToolResult(_) => {}
        }
    }

    let reason = if has_tool {
        FinishReason::Tool
    } else {
        result.reason.unwrap_or(FinishReason::Stop)
    };

    GenerateContentResponse {
        response_id: meta.id.clone(),
        model_version: meta.model.clone(),
        candidates: vec![Candidate {
            content: Some(GeminiContent {
                role: "model".to_string(),
                parts,
            }),
            finish_reason: Some(finish_reason(reason)),
            index: 0,
        }],
        usage_metadata: Some(usage_metadata(result.usage.unwrap_or_default())),
    }
}

/// Canonical status name for an HTTP status code
#[must_use]
pub fn status_name(code: u16) -> &'static str {
    match code {
        400 => "INVALID_ARGUMENT",
        401 => "UNAUTHENTICATED",
        403 => "PERMISSION_DENIED",
        404 => "NOT_FOUND",
        429 => "RESOURCE_EXHAUSTED",
        503 => "UNAVAILABLE",
        504 => "DEADLINE_EXCEEDED",
        _ => "INTERNAL",
    }
}

/// Build an error body
#[must_use]
pub fn error_response(error: &GatewayError) -> ErrorResponse {
    let code = error.status_code();
    ErrorResponse {
        error: ApiError {
            code,
            message: error.message().to_string(),
            status: status_name(code),
        },
    }
}
