//! Translation between chat completion messages and gateway messages.

use super::types::{
    ChatCompletion, ChatCompletionChunk, ChatCompletionRequest, ChatContent, ChatContentPart,
    ChatFinishReason, ChatMessage, ChatTool, ChatToolCall, ChatUsage, Choice, ErrorDetail,
    ErrorResponse, FileData, FunctionCall, FunctionDefinition, ImageUrl, JsonSchema,
    ResponseFormat,
};
use crate::convert::{arguments_text, data_url, file_from_url};
use crate::emitter::ResponseMeta;
use gateway_core::{
    CompleteOptions, Content, Delta, FinishReason, Format, GatewayError, GatewayResult, Message,
    Reasoning, Role, Schema, Tool, ToolCall, Usage,
};
use std::collections::HashMap;

/// Convert a request into conversation history and options
///
/// # Errors
/// Returns a translation error for content the gateway cannot represent
pub fn to_completion(
    request: ChatCompletionRequest,
) -> GatewayResult<(Vec<Message>, CompleteOptions)> {
    let messages = request
        .messages
        .into_iter()
        .enumerate()
        .map(|(i, message)| to_message(message, i))
        .collect::<GatewayResult<Vec<_>>>()?;

    let mut options = CompleteOptions::new();
    options.max_tokens = request.max_completion_tokens.or(request.max_tokens);
    options.temperature = request.temperature;
    options.stop = request.stop.map(|s| s.into_vec()).unwrap_or_default();
    options.effort = request.reasoning_effort;
    options.verbosity = request.verbosity;

    for tool in request.tools.unwrap_or_default() {
        if tool.kind != "function" {
            return Err(GatewayError::translation(
                format!("unsupported tool type '{}'", tool.kind),
                Some("tools"),
                "unsupported_tool",
            ));
        }
        options.tools.push(Tool {
            name: tool.function.name,
            description: tool.function.description,
            parameters: tool.function.parameters,
            strict: tool.function.strict,
        });
    }

    match request.response_format {
        Some(ResponseFormat::JsonObject) => options.format = Some(Format::Json),
        Some(ResponseFormat::JsonSchema { json_schema }) => {
            options.schema = Some(Schema {
                name: json_schema.name,
                description: json_schema.description,
                strict: json_schema.strict,
                schema: json_schema.schema,
            });
        }
        Some(ResponseFormat::Text) | None => {}
    }

    options.validate()?;
    Ok((messages, options))
}

fn to_message(message: ChatMessage, index: usize) -> GatewayResult<Message> {
    let field = format!("messages[{index}]");
    let role = match message.role.as_str() {
        "system" | "developer" => Role::System,
        "user" => Role::User,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        other => {
            return Err(GatewayError::translation(
                format!("unsupported role '{other}'"),
                Some(format!("{field}.role").as_str()),
                "invalid_role",
            ))
        }
    };

    if role == Role::Tool {
        let id = message.tool_call_id.ok_or_else(|| {
            GatewayError::translation(
                "tool messages require tool_call_id",
                Some(format!("{field}.tool_call_id").as_str()),
                "missing_tool_call_id",
            )
        })?;
        let data = content_text(message.content);
        return Ok(Message::tool(id, data));
    }

    let mut content = Vec::new();
    if let Some(reasoning) = message.reasoning_content.filter(|r| !r.is_empty()) {
        content.push(Content::Reasoning(Reasoning {
            text: reasoning,
            ..Reasoning::default()
        }));
    }
    match message.content {
        Some(ChatContent::Text(text)) => content.push(Content::Text(text)),
        Some(ChatContent::Parts(parts)) => {
            for part in parts {
                content.push(match part {
                    ChatContentPart::Text { text } => Content::Text(text),
                    ChatContentPart::Refusal { refusal } => Content::Refusal(refusal),
                    ChatContentPart::ImageUrl { image_url } => Content::File(file_from_url(
                        &image_url.url,
                        None,
                        format!("{field}.content.image_url").as_str(),
                    )?),
                    ChatContentPart::File { file } => {
                        let url = file.file_data.ok_or_else(|| {
                            GatewayError::translation(
                                "file parts require file_data",
                                Some(format!("{field}.content.file").as_str()),
                                "unsupported_file",
                            )
                        })?;
                        Content::File(file_from_url(
                            &url,
                            file.filename,
                            format!("{field}.content.file").as_str(),
                        )?)
                    }
                });
            }
        }
        None => {}
    }
    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        content.push(Content::Refusal(refusal));
    }
    for call in message.tool_calls.unwrap_or_default() {
        let arguments = call.function.arguments.unwrap_or_default();
        let arguments = arguments_text(
            &serde_json::Value::String(arguments),
            format!("{field}.tool_calls").as_str(),
        )?;
        content.push(Content::ToolCall(ToolCall {
            id: call.id.unwrap_or_default(),
            name: call.function.name.unwrap_or_default(),
            arguments,
        }));
    }

    Ok(Message::new(role, content))
}

fn content_text(content: Option<ChatContent>) -> String {
    match content {
        None => String::new(),
        Some(ChatContent::Text(text)) => text,
        Some(ChatContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|p| match p {
                ChatContentPart::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Convert gateway messages into chat messages for an upstream request
#[must_use]
pub fn from_messages(messages: &[Message]) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        if message.role == Role::Tool {
            for part in &message.content {
                if let Content::ToolResult(result) = part {
                    out.push(ChatMessage {
                        role: "tool".to_string(),
                        content: Some(ChatContent::Text(result.data.clone())),
                        tool_call_id: Some(result.id.clone()),
                        ..ChatMessage::default()
                    });
                }
            }
            continue;
        }

        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();
        let mut reasoning = String::new();
        for part in &message.content {
            match part {
                Content::Text(text) => parts.push(ChatContentPart::Text { text: text.clone() }),
                Content::Refusal(refusal) => parts.push(ChatContentPart::Refusal {
                    refusal: refusal.clone(),
                }),
                Content::File(file) if file.content_type.starts_with("image/") => {
                    parts.push(ChatContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(file),
                            detail: None,
                        },
                    });
                }
                Content::File(file) => parts.push(ChatContentPart::File {
                    file: FileData {
                        file_data: Some(data_url(file)),
                        filename: file.name.clone(),
                    },
                }),
                Content::ToolCall(call) => tool_calls.push(ChatToolCall {
                    index: None,
                    id: Some(call.id.clone()),
                    kind: Some("function".to_string()),
                    function: FunctionCall {
                        name: Some(call.name.clone()),
                        arguments: Some(call.arguments.clone()),
                    },
                }),
                Content::Reasoning(r) => reasoning.push_str(&r.text),
                Content::ToolResult(result) => out.push(ChatMessage {
                    role: "tool".to_string(),
                    content: Some(ChatContent::Text(result.data.clone())),
                    tool_call_id: Some(result.id.clone()),
                    ..ChatMessage::default()
                }),
            }
        }

        let content = match parts.as_slice() {
            [] => None,
            [ChatContentPart::Text { text }] => Some(ChatContent::Text(text.clone())),
            _ => Some(ChatContent::Parts(parts)),
        };
        out.push(ChatMessage {
            role: message.role.as_str().to_string(),
            content,
            reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            ..ChatMessage::default()
        });
    }

    out
}

/// Convert gateway tools into chat tool definitions
#[must_use]
pub fn from_tools(tools: &[Tool]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|tool| ChatTool {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
                strict: tool.strict,
            },
        })
        .collect()
}

/// Convert a schema constraint into a response format
#[must_use]
pub fn response_format(options: &CompleteOptions) -> Option<ResponseFormat> {
    if let Some(schema) = options.schema.as_ref() {
        return Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchema {
                name: schema.name.clone(),
                description: schema.description.clone(),
                schema: schema.schema.clone(),
                strict: schema.strict,
            },
        });
    }
    options.format.map(|_| ResponseFormat::JsonObject)
}

/// Map a termination reason to a chat finish reason
#[must_use]
pub fn finish_reason(reason: FinishReason) -> ChatFinishReason {
    match reason {
        FinishReason::Stop => ChatFinishReason::Stop,
        FinishReason::Length => ChatFinishReason::Length,
        FinishReason::Tool => ChatFinishReason::ToolCalls,
        FinishReason::Filter => ChatFinishReason::ContentFilter,
    }
}

pub(crate) fn usage(usage: Usage) -> ChatUsage {
    ChatUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage.total(),
    }
}

/// Turns upstream chunks into deltas.
///
/// Upstream tool call fragments after the first carry only a per-choice
/// index; the translator remembers which id each index belongs to.
#[derive(Debug, Default)]
pub struct ChunkTranslator {
    tool_ids: HashMap<u32, String>,
}

impl ChunkTranslator {
    /// Create a translator for one response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one upstream chunk
    pub fn translate(&mut self, chunk: ChatCompletionChunk) -> Delta {
        let mut delta = Delta {
            id: (!chunk.id.is_empty()).then_some(chunk.id),
            model: (!chunk.model.is_empty()).then_some(chunk.model),
            usage: chunk.usage.map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
            ..Delta::default()
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return delta;
        };

        delta.reason = choice.finish_reason.and_then(|reason| match reason {
            ChatFinishReason::Stop => Some(FinishReason::Stop),
            ChatFinishReason::Length => Some(FinishReason::Length),
            ChatFinishReason::ToolCalls | ChatFinishReason::FunctionCall => Some(FinishReason::Tool),
            ChatFinishReason::ContentFilter => Some(FinishReason::Filter),
            ChatFinishReason::Other => None,
        });

        let fragment = choice.delta;
        let mut content = Vec::new();
        if let Some(reasoning) = fragment.reasoning_content.filter(|r| !r.is_empty()) {
            content.push(Content::Reasoning(Reasoning {
                text: reasoning,
                ..Reasoning::default()
            }));
        }
        if let Some(text) = fragment.content.filter(|t| !t.is_empty()) {
            content.push(Content::Text(text));
        }
        if let Some(refusal) = fragment.refusal.filter(|r| !r.is_empty()) {
            content.push(Content::Refusal(refusal));
        }
        for call in fragment.tool_calls.unwrap_or_default() {
            let index = call.index.unwrap_or(0);
            let id = match call.id.filter(|id| !id.is_empty()) {
                Some(id) => {
                    self.tool_ids.insert(index, id.clone());
                    id
                }
                None => self.tool_ids.get(&index).cloned().unwrap_or_default(),
            };
            content.push(Content::ToolCall(ToolCall {
                id,
                name: call.function.name.unwrap_or_default(),
                arguments: call.function.arguments.unwrap_or_default(),
            }));
        }

        if !content.is_empty() {
            let role = match fragment.role.as_deref() {
                Some("tool") => Role::Tool,
                _ => Role::Assistant,
            };
            delta.message = Some(Message::new(role, content));
        }
        delta
    }
}

/// Build a non-streaming response from an accumulated result
#[must_use]
pub fn completion_response(meta: &ResponseMeta, result: &Delta) -> ChatCompletion {
    let message = result.message.clone().unwrap_or_default();
    let text = message.text();
    let refusal = message.refusal();
    let reasoning = message.reasoning().map(|r| r.text.clone()).filter(|r| !r.is_empty());

    let tool_calls: Vec<ChatToolCall> = message
        .tool_calls()
        .into_iter()
        .map(|call| ChatToolCall {
            index: None,
            id: Some(call.id.clone()),
            kind: Some("function".to_string()),
            function: FunctionCall {
                name: Some(call.name.clone()),
                arguments: Some(call.arguments.clone()),
            },
        })
        .collect();

    let reason = if tool_calls.is_empty() {
        result.reason.unwrap_or(FinishReason::Stop)
    } else {
        FinishReason::Tool
    };

    ChatCompletion {
        id: meta.id.clone(),
        object: "chat.completion".to_string(),
        created: meta.created,
        model: meta.model.clone(),
        choices: vec![Choice {
            index: 0,
            message: ChatMessage {
                role: "assistant".to_string(),
                content: Some(ChatContent::Text(text)),
                refusal: (!refusal.is_empty()).then_some(refusal),
                reasoning_content: reasoning,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
            },
            finish_reason: Some(finish_reason(reason)),
        }],
        usage: Some(usage(result.usage.unwrap_or_default())),
    }
}

/// Build an error body
#[must_use]
pub fn error_response(error: &GatewayError) -> ErrorResponse {
    let (param, code) = match error {
        GatewayError::Translation { field, code, .. } => (field.clone(), Some(code.clone())),
        _ => (None, None),
    };
    ErrorResponse {
        error: ErrorDetail {
            message: error.message().to_string(),
            kind: error.error_type().to_string(),
            param,
            code,
        },
    }
}
