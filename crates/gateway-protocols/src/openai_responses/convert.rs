//! Translation between Responses items and gateway messages.

use super::types::{
    IncompleteDetails, InputItem, InputMessage, InputPart, MessageContent, OutputContent,
    OutputItem, Response, ResponseError, ResponseUsage, ResponsesInput, ResponsesRequest,
    TextFormat, TextPart, TypedItem,
};
use crate::convert::{arguments_text, file_from_url, new_id};
use crate::emitter::ResponseMeta;
use gateway_core::{
    CompleteOptions, Content, Delta, FinishReason, Format, GatewayError, GatewayResult, Message,
    Reasoning, Role, Schema, Tool, ToolCall, Usage,
};

/// Convert a request into conversation history and options
///
/// # Errors
/// Returns a translation error for content the gateway cannot represent
pub fn to_completion(request: ResponsesRequest) -> GatewayResult<(Vec<Message>, CompleteOptions)> {
    let mut messages = Vec::new();

    if let Some(instructions) = request.instructions.filter(|i| !i.is_empty()) {
        messages.push(Message::system(instructions));
    }

    match request.input {
        ResponsesInput::Text(text) => messages.push(Message::user(text)),
        ResponsesInput::Items(items) => {
            for (i, item) in items.into_iter().enumerate() {
                add_item(&mut messages, item, i)?;
            }
        }
    }

    let mut options = CompleteOptions::new();
    options.max_tokens = request.max_output_tokens;
    options.temperature = request.temperature;
    options.effort = request.reasoning.and_then(|r| r.effort);

    for tool in request.tools.unwrap_or_default() {
        if tool.kind != "function" {
            return Err(GatewayError::translation(
                format!("unsupported tool type '{}'", tool.kind),
                Some("tools"),
                "unsupported_tool",
            ));
        }
        options.tools.push(Tool {
            name: tool.name,
            description: tool.description,
            parameters: tool.parameters,
            strict: tool.strict,
        });
    }

    if let Some(text) = request.text {
        options.verbosity = text.verbosity;
        match text.format {
            Some(TextFormat::JsonObject) => options.format = Some(Format::Json),
            Some(TextFormat::JsonSchema {
                name,
                description,
                schema,
                strict,
            }) => {
                options.schema = Some(Schema {
                    name,
                    description,
                    strict,
                    schema,
                });
            }
            Some(TextFormat::Text) | None => {}
        }
    }

    options.validate()?;
    Ok((messages, options))
}

/// Append assistant-side content to the trailing assistant message, or start one
fn push_assistant(messages: &mut Vec<Message>, content: Content) {
    match messages.last_mut() {
        Some(last) if last.role == Role::Assistant => last.content.push(content),
        _ => messages.push(Message::new(Role::Assistant, vec![content])),
    }
}

fn add_item(messages: &mut Vec<Message>, item: InputItem, index: usize) -> GatewayResult<()> {
    let field = format!("input[{index}]");
    match item {
        InputItem::Message(message) | InputItem::Typed(TypedItem::Message(message)) => {
            add_message(messages, message, &field)?;
        }
        InputItem::Typed(TypedItem::Reasoning {
            id,
            summary,
            content,
            encrypted_content,
        }) => {
            let join = |parts: Vec<TextPart>| {
                parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join("\n")
            };
            push_assistant(
                messages,
                Content::Reasoning(Reasoning {
                    id: id.unwrap_or_default(),
                    text: content.map(join).unwrap_or_default(),
                    summary: join(summary),
                    signature: encrypted_content.unwrap_or_default(),
                }),
            );
        }
        InputItem::Typed(TypedItem::FunctionCall {
            call_id,
            name,
            arguments,
            ..
        }) => {
            let arguments = arguments_text(
                &serde_json::Value::String(arguments),
                format!("{field}.arguments").as_str(),
            )?;
            push_assistant(messages, Content::ToolCall(ToolCall::new(call_id, name, arguments)));
        }
        InputItem::Typed(TypedItem::FunctionCallOutput { call_id, output }) => {
            messages.push(Message::tool(call_id, output));
        }
    }
    Ok(())
}

fn add_message(messages: &mut Vec<Message>, message: InputMessage, field: &str) -> GatewayResult<()> {
    let role = match message.role.as_str() {
        "system" | "developer" => Role::System,
        "user" => Role::User,
        "assistant" => Role::Assistant,
        other => {
            return Err(GatewayError::translation(
                format!("unsupported role '{other}'"),
                Some(format!("{field}.role").as_str()),
                "invalid_role",
            ))
        }
    };

    let parts = match message.content {
        MessageContent::Text(text) => vec![InputPart::InputText { text }],
        MessageContent::Parts(parts) => parts,
    };

    let mut content = Vec::with_capacity(parts.len());
    for part in parts {
        content.push(match part {
            InputPart::InputText { text } | InputPart::OutputText { text } => Content::Text(text),
            InputPart::Refusal { refusal } => Content::Refusal(refusal),
            InputPart::InputImage { image_url } => {
                let url = image_url.ok_or_else(|| {
                    GatewayError::translation(
                        "input_image requires image_url",
                        Some(format!("{field}.content").as_str()),
                        "unsupported_file",
                    )
                })?;
                Content::File(file_from_url(&url, None, format!("{field}.content").as_str())?)
            }
            InputPart::InputFile {
                filename,
                file_data,
                file_url,
            } => {
                let url = file_data.or(file_url).ok_or_else(|| {
                    GatewayError::translation(
                        "input_file requires file_data",
                        Some(format!("{field}.content").as_str()),
                        "unsupported_file",
                    )
                })?;
                Content::File(file_from_url(&url, filename, format!("{field}.content").as_str())?)
            }
        });
    }

    if role == Role::Assistant {
        for part in content {
            push_assistant(messages, part);
        }
    } else {
        messages.push(Message::new(role, content));
    }
    Ok(())
}

pub(crate) fn usage(usage: Usage) -> ResponseUsage {
    ResponseUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        total_tokens: usage.total(),
    }
}

pub(crate) fn status(reason: FinishReason) -> (&'static str, Option<IncompleteDetails>) {
    match reason {
        FinishReason::Length => (
            "incomplete",
            Some(IncompleteDetails {
                reason: "max_output_tokens",
            }),
        ),
        FinishReason::Filter => (
            "incomplete",
            Some(IncompleteDetails {
                reason: "content_filter",
            }),
        ),
        FinishReason::Stop | FinishReason::Tool => ("completed", None),
    }
}

pub(crate) fn reasoning_item(id: String, reasoning: &Reasoning) -> OutputItem {
    OutputItem::Reasoning {
        id,
        summary: if reasoning.summary.is_empty() {
            Vec::new()
        } else {
            vec![TextPart::new("summary_text", reasoning.summary.clone())]
        },
        content: if reasoning.text.is_empty() {
            Vec::new()
        } else {
            vec![TextPart::new("reasoning_text", reasoning.text.clone())]
        },
        encrypted_content: (!reasoning.signature.is_empty()).then(|| reasoning.signature.clone()),
    }
}

pub(crate) fn function_call_item(call: &ToolCall, status: &'static str) -> OutputItem {
    OutputItem::FunctionCall {
        id: call.id.clone(),
        status,
        call_id: call.id.clone(),
        name: call.name.clone(),
        arguments: call.arguments.clone(),
    }
}

/// Build a non-streaming response from an accumulated result
#[must_use]
pub fn response(meta: &ResponseMeta, result: &Delta) -> Response {
    let mut output = Vec::new();
    let mut message_content = Vec::new();
    let mut has_tool = false;

    for part in result.parts() {
        match part {
            Content::Reasoning(reasoning) => {
                let id = if reasoning.id.is_empty() {
                    new_id("rs")
                } else {
                    reasoning.id.clone()
                };
                output.push(reasoning_item(id, reasoning));
            }
            Content::Text(text) => message_content.push(OutputContent::text(text.clone())),
            Content::Refusal(refusal) => message_content.push(OutputContent::Refusal {
                refusal: refusal.clone(),
            }),
            Content::ToolCall(call) => {
                if !message_content.is_empty() {
                    output.push(message_item(std::mem::take(&mut message_content)));
                }
                has_tool = true;
                output.push(function_call_item(call, "completed"));
            }
            Content::File(_) | Content::ToolResult(_) => {}
        }
    }
    if !message_content.is_empty() {
        output.push(message_item(message_content));
    }

    let reason = if has_tool {
        FinishReason::Tool
    } else {
        result.reason.unwrap_or(FinishReason::Stop)
    };
    let (status, incomplete_details) = status(reason);

    Response {
        id: meta.id.clone(),
        object: "response",
        created_at: meta.created,
        status,
        model: meta.model.clone(),
        output,
        usage: Some(usage(result.usage.unwrap_or_default())),
        incomplete_details,
        error: None,
    }
}

fn message_item(content: Vec<OutputContent>) -> OutputItem {
    OutputItem::Message {
        id: new_id("msg"),
        status: "completed",
        role: "assistant",
        content,
    }
}

/// Response snapshot reporting a failure
pub(crate) fn failed_response(meta: &ResponseMeta, error: &GatewayError) -> Response {
    let code = match error {
        GatewayError::Translation { .. } => "invalid_prompt",
        GatewayError::Provider { status_code: Some(429), .. } => "rate_limit_exceeded",
        _ => "server_error",
    };
    Response {
        id: meta.id.clone(),
        object: "response",
        created_at: meta.created,
        status: "failed",
        model: meta.model.clone(),
        output: Vec::new(),
        usage: None,
        incomplete_details: None,
        error: Some(ResponseError {
            code,
            message: error.message().to_string(),
        }),
    }
}
