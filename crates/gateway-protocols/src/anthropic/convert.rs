//! Translation between Anthropic messages and gateway messages.

use super::types::{
    ContentBlock, ErrorBody, ErrorResponse, InputBlock, InputContent, MessageResponse,
    MessagesRequest, Source, StopReason, SystemPrompt, ToolResultContent, Usage,
};
use crate::convert::{arguments_value, decode_base64};
use crate::emitter::ResponseMeta;
use gateway_core::{
    CompleteOptions, Content, Delta, Effort, File, FinishReason, GatewayError, GatewayResult,
    Message, Reasoning, Role, Tool, ToolCall, ToolResult,
};

/// Convert a request into conversation history and options
///
/// # Errors
/// Returns a translation error for content the gateway cannot represent
pub fn to_completion(request: MessagesRequest) -> GatewayResult<(Vec<Message>, CompleteOptions)> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    match request.system {
        Some(SystemPrompt::Text(text)) if !text.is_empty() => messages.push(Message::system(text)),
        Some(SystemPrompt::Blocks(blocks)) if !blocks.is_empty() => {
            let text = blocks.into_iter().map(|b| b.text).collect::<Vec<_>>().join("\n\n");
            messages.push(Message::system(text));
        }
        _ => {}
    }

    for (i, turn) in request.messages.into_iter().enumerate() {
        let role = match turn.role.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                return Err(GatewayError::translation(
                    format!("unsupported role '{other}'"),
                    Some(format!("messages[{i}].role").as_str()),
                    "invalid_role",
                ))
            }
        };

        let blocks = match turn.content {
            InputContent::Text(text) => vec![InputBlock::Text { text }],
            InputContent::Blocks(blocks) => blocks,
        };

        let mut content = Vec::with_capacity(blocks.len());
        for block in blocks {
            match block {
                InputBlock::ToolResult {
                    tool_use_id,
                    content: result,
                } => messages.push(Message::new(
                    Role::Tool,
                    vec![Content::ToolResult(ToolResult {
                        id: tool_use_id,
                        data: tool_result_text(result),
                    })],
                )),
                other => content.push(convert_block(other, i)?),
            }
        }

        if !content.is_empty() {
            messages.push(Message::new(role, content));
        }
    }

    let mut options = CompleteOptions::new();
    options.max_tokens = request.max_tokens;
    options.temperature = request.temperature;
    options.stop = request.stop_sequences.unwrap_or_default();
    options.tools = request
        .tools
        .unwrap_or_default()
        .into_iter()
        .map(|tool| Tool {
            name: tool.name,
            description: tool.description,
            parameters: tool.input_schema,
            strict: None,
        })
        .collect();
    options.effort = request
        .thinking
        .filter(|t| t.kind == "enabled")
        .map(|t| match t.budget_tokens.unwrap_or(0) {
            0..=1024 => Effort::Low,
            1025..=8192 => Effort::Medium,
            _ => Effort::High,
        });
    options.validate()?;

    Ok((messages, options))
}

fn convert_block(block: InputBlock, turn: usize) -> GatewayResult<Content> {
    let field = format!("messages[{turn}].content");
    Ok(match block {
        InputBlock::Text { text } => Content::Text(text),
        InputBlock::Image { source } | InputBlock::Document { source } => {
            Content::File(source_file(source, &field)?)
        }
        InputBlock::ToolUse { id, name, input } => Content::ToolCall(ToolCall {
            id,
            name,
            arguments: input.to_string(),
        }),
        InputBlock::Thinking {
            thinking,
            signature,
        } => Content::Reasoning(Reasoning {
            text: thinking,
            signature,
            ..Reasoning::default()
        }),
        InputBlock::RedactedThinking { data } => Content::Reasoning(Reasoning {
            signature: data,
            ..Reasoning::default()
        }),
        InputBlock::ToolResult { .. } => {
            return Err(GatewayError::translation(
                "nested tool results are not supported",
                Some(field.as_str()),
                "unsupported_content",
            ))
        }
    })
}

fn source_file(source: Source, field: &str) -> GatewayResult<File> {
    match source {
        Source::Base64 { media_type, data } => Ok(File {
            name: None,
            content_type: media_type,
            content: decode_base64(&data, field)?,
        }),
        Source::Text { media_type, data } => Ok(File {
            name: None,
            content_type: media_type.unwrap_or_else(|| "text/plain".to_string()),
            content: data.into_bytes(),
        }),
        Source::Url { .. } => Err(GatewayError::translation(
            "url sources are not supported, send the content inline",
            Some(field),
            "unsupported_file_url",
        )),
    }
}

fn tool_result_text(content: Option<ToolResultContent>) -> String {
    match content {
        None => String::new(),
        Some(ToolResultContent::Text(text)) => text,
        Some(ToolResultContent::Blocks(blocks)) => blocks
            .into_iter()
            .filter_map(|b| match b {
                InputBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Map a termination reason to an Anthropic stop reason
#[must_use]
pub fn stop_reason(reason: FinishReason) -> StopReason {
    match reason {
        FinishReason::Stop => StopReason::EndTurn,
        FinishReason::Length => StopReason::MaxTokens,
        FinishReason::Tool => StopReason::ToolUse,
        FinishReason::Filter => StopReason::Refusal,
    }
}

pub(crate) fn usage(usage: gateway_core::Usage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
    }
}

/// Build a non-streaming response from an accumulated result
#[must_use]
pub fn message_response(meta: &ResponseMeta, result: &Delta) -> MessageResponse {
    let mut content = Vec::new();
    let mut has_tool = false;

    for part in result.parts() {
        match part {
            Content::Reasoning(reasoning) => content.push(ContentBlock::Thinking {
                thinking: reasoning.text.clone(),
                signature: reasoning.signature.clone(),
            }),
            Content::Text(text) | Content::Refusal(text) => {
                content.push(ContentBlock::Text { text: text.clone() });
            }
            Content::ToolCall(call) => {
                has_tool = true;
                content.push(ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: arguments_value(&call.arguments),
                });
            }
            Content::File(_) | Content::ToolResult(_) => {}
        }
    }

    let reason = if has_tool {
        FinishReason::Tool
    } else {
        result.reason.unwrap_or(FinishReason::Stop)
    };

    MessageResponse {
        id: meta.id.clone(),
        kind: "message",
        role: "assistant",
        model: meta.model.clone(),
        content,
        stop_reason: Some(stop_reason(reason)),
        stop_sequence: None,
        usage: usage(result.usage.unwrap_or_default()),
    }
}

pub(crate) fn error_body(error: &GatewayError) -> ErrorBody {
    let kind = match error {
        GatewayError::Unavailable { .. } => "overloaded_error",
        GatewayError::NotFound { .. } => "not_found_error",
        GatewayError::Translation { .. } => "invalid_request_error",
        _ => "api_error",
    };
    ErrorBody {
        kind: kind.to_string(),
        message: error.message().to_string(),
    }
}

/// Build a non-streaming error body
#[must_use]
pub fn error_response(error: &GatewayError) -> ErrorResponse {
    ErrorResponse {
        kind: "error",
        error: error_body(error),
    }
}
