//! Anthropic streaming events.

use super::convert::{error_body, stop_reason, usage};
use super::types::{BlockDelta, ContentBlock, MessageDeltaBody, MessageResponse, StreamEvent};
use crate::emitter::{Block, BlockKind, Completion, FrameWriter, ResponseMeta};
use crate::sse::{to_json, ProtocolEvent, SseFrame};
use gateway_core::{GatewayError, Reasoning, Usage};

impl ProtocolEvent for StreamEvent {
    fn frame(&self) -> SseFrame {
        SseFrame::named(self.name(), to_json(self))
    }
}

/// Renders the lifecycle as Anthropic `message_*` and `content_block_*` events
#[derive(Debug, Default)]
pub struct AnthropicWriter;

impl AnthropicWriter {
    /// Create a writer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FrameWriter for AnthropicWriter {
    type Event = StreamEvent;

    fn start(&mut self, meta: &ResponseMeta, start_usage: Usage, out: &mut Vec<StreamEvent>) {
        out.push(StreamEvent::MessageStart {
            message: MessageResponse {
                id: meta.id.clone(),
                kind: "message",
                role: "assistant",
                model: meta.model.clone(),
                content: Vec::new(),
                stop_reason: None,
                stop_sequence: None,
                usage: usage(Usage::new(start_usage.input_tokens, 0)),
            },
        });
    }

    fn block_start(&mut self, block: &Block, out: &mut Vec<StreamEvent>) {
        let content_block = match block.kind {
            BlockKind::Text => ContentBlock::Text {
                text: String::new(),
            },
            BlockKind::Reasoning => ContentBlock::Thinking {
                thinking: String::new(),
                signature: String::new(),
            },
            BlockKind::ToolCall => ContentBlock::ToolUse {
                id: block.id.clone(),
                name: block.name.clone(),
                input: serde_json::Value::Object(serde_json::Map::new()),
            },
        };
        out.push(StreamEvent::ContentBlockStart {
            index: block.index,
            content_block,
        });
    }

    fn text_delta(&mut self, block: &Block, text: &str, out: &mut Vec<StreamEvent>) {
        out.push(StreamEvent::ContentBlockDelta {
            index: block.index,
            delta: BlockDelta::TextDelta {
                text: text.to_string(),
            },
        });
    }

    fn reasoning_delta(&mut self, block: &Block, fragment: &Reasoning, out: &mut Vec<StreamEvent>) {
        let thinking = if fragment.text.is_empty() {
            &fragment.summary
        } else {
            &fragment.text
        };
        if !thinking.is_empty() {
            out.push(StreamEvent::ContentBlockDelta {
                index: block.index,
                delta: BlockDelta::ThinkingDelta {
                    thinking: thinking.clone(),
                },
            });
        }
        if !fragment.signature.is_empty() {
            out.push(StreamEvent::ContentBlockDelta {
                index: block.index,
                delta: BlockDelta::SignatureDelta {
                    signature: fragment.signature.clone(),
                },
            });
        }
    }

    fn arguments_delta(&mut self, block: &Block, arguments: &str, out: &mut Vec<StreamEvent>) {
        out.push(StreamEvent::ContentBlockDelta {
            index: block.index,
            delta: BlockDelta::InputJsonDelta {
                partial_json: arguments.to_string(),
            },
        });
    }

    fn block_stop(&mut self, block: &Block, out: &mut Vec<StreamEvent>) {
        out.push(StreamEvent::ContentBlockStop { index: block.index });
    }

    fn finish(&mut self, completion: &Completion<'_>, out: &mut Vec<StreamEvent>) {
        out.push(StreamEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: stop_reason(completion.reason),
                stop_sequence: None,
            },
            usage: usage(completion.usage),
        });
        out.push(StreamEvent::MessageStop);
    }

    fn failure(&mut self, error: &GatewayError, out: &mut Vec<StreamEvent>) {
        out.push(StreamEvent::Error {
            error: error_body(error),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::StreamEmitter;
    use gateway_core::{Content, Delta, FinishReason, ToolCall};
    use serde_json::json;

    fn emitter() -> StreamEmitter<AnthropicWriter> {
        StreamEmitter::new(AnthropicWriter::new(), ResponseMeta::new("msg_1", "claude"))
    }

    fn names(events: &[StreamEvent]) -> Vec<&'static str> {
        events.iter().map(StreamEvent::name).collect()
    }

    #[test]
    fn test_text_then_tool_stream() {
        let mut emitter = emitter();
        let mut events = Vec::new();
        events.extend(emitter.push(Delta::text("Let me check.").with_usage(gateway_core::Usage::new(25, 0))));
        events.extend(emitter.push(Delta::content(Content::ToolCall(ToolCall::new(
            "toolu_1", "weather", "{\"city\":",
        )))));
        events.extend(emitter.push(Delta::content(Content::ToolCall(ToolCall::new("", "", "\"Oslo\"}")))));
        events.extend(emitter.push(Delta::default().with_usage(gateway_core::Usage::new(25, 14))));
        events.extend(emitter.finish());

        assert_eq!(
            names(&events),
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "content_block_start",
                "content_block_delta",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );

        let start = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(start["message"]["id"], "msg_1");
        assert_eq!(start["message"]["usage"]["input_tokens"], 25);

        let tool_start = serde_json::to_value(&events[4]).unwrap();
        assert_eq!(
            tool_start,
            json!({
                "type": "content_block_start",
                "index": 1,
                "content_block": {"type": "tool_use", "id": "toolu_1", "name": "weather", "input": {}}
            })
        );

        let delta = serde_json::to_value(&events[5]).unwrap();
        assert_eq!(delta["delta"], json!({"type": "input_json_delta", "partial_json": "{\"city\":"}));

        let message_delta = serde_json::to_value(&events[8]).unwrap();
        assert_eq!(message_delta["delta"]["stop_reason"], "tool_use");
        assert_eq!(message_delta["usage"]["output_tokens"], 14);
    }

    #[test]
    fn test_tool_continuation_after_text_opens_distinct_block() {
        let mut emitter = emitter();
        let mut events = emitter.push(Delta::content(Content::ToolCall(ToolCall::new(
            "toolu_1", "f", "{\"x\":",
        ))));
        events.extend(emitter.push(Delta::text("hmm")));
        events.extend(emitter.push(Delta::content(Content::ToolCall(ToolCall::new("", "", "1}")))));
        events.extend(emitter.finish());

        let starts = events.iter().filter(|e| e.name() == "content_block_start").count();
        let stops = events.iter().filter(|e| e.name() == "content_block_stop").count();
        assert_eq!(starts, 3);
        assert_eq!(stops, 3);

        let tool_blocks: Vec<_> = events
            .iter()
            .map(|e| serde_json::to_value(e).unwrap())
            .filter(|v| v["type"] == "content_block_start" && v["content_block"]["type"] == "tool_use")
            .map(|v| v["content_block"].clone())
            .collect();
        assert_eq!(
            tool_blocks,
            vec![
                json!({"type": "tool_use", "id": "toolu_1", "name": "f", "input": {}}),
                json!({"type": "tool_use", "id": "toolu_1-2", "name": "f", "input": {}}),
            ]
        );
    }

    #[test]
    fn test_empty_response() {
        let events = emitter().finish();
        assert_eq!(
            names(&events),
            vec![
                "message_start",
                "content_block_start",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
        let block = serde_json::to_value(&events[1]).unwrap();
        assert_eq!(block["index"], 0);
        assert_eq!(block["content_block"], json!({"type": "text", "text": ""}));
    }

    #[test]
    fn test_max_tokens_stop_reason() {
        let mut emitter = emitter();
        let mut events = emitter.push(Delta::text("cut").with_reason(FinishReason::Length));
        events.extend(emitter.finish());

        let message_delta = serde_json::to_value(&events[events.len() - 2]).unwrap();
        assert_eq!(message_delta["delta"]["stop_reason"], "max_tokens");
    }

    #[test]
    fn test_error_event() {
        let mut emitter = emitter();
        let mut events = emitter.push(Delta::text("partial"));
        events.extend(emitter.fail(&GatewayError::provider("p", "connection reset", None, true)));

        assert_eq!(
            names(&events),
            vec!["message_start", "content_block_start", "content_block_delta", "error"]
        );
        let frame = events[3].frame();
        assert_eq!(frame.event, Some("error"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&frame.data).unwrap(),
            json!({"type": "error", "error": {"type": "api_error", "message": "connection reset"}})
        );
    }
}
