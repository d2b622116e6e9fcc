//! Chat completion chunks.

use super::convert::{error_response, finish_reason, usage};
use super::types::{
    ChatCompletionChunk, ChatEvent, ChatToolCall, ChunkChoice, ChunkDelta, FunctionCall,
};
use crate::emitter::{Block, BlockKind, Completion, FrameWriter, ResponseMeta};
use crate::sse::{to_json, ProtocolEvent, SseFrame};
use gateway_core::{GatewayError, Reasoning, Usage};

impl ProtocolEvent for ChatEvent {
    fn frame(&self) -> SseFrame {
        match self {
            Self::Chunk(chunk) => SseFrame::data(to_json(chunk)),
            Self::Error(error) => SseFrame::data(to_json(error)),
            Self::Done => SseFrame::data("[DONE]"),
        }
    }
}

/// Renders the lifecycle as `chat.completion.chunk` objects ending in `[DONE]`
#[derive(Debug, Default)]
pub struct ChatWriter {
    include_usage: bool,
    meta: Option<ResponseMeta>,
}

impl ChatWriter {
    /// Create a writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a usage-only chunk before `[DONE]`
    #[must_use]
    pub fn with_usage(mut self, include_usage: bool) -> Self {
        self.include_usage = include_usage;
        self
    }

    fn chunk(&self, delta: ChunkDelta) -> ChatEvent {
        let mut chunk = self.empty_chunk();
        chunk.choices.push(ChunkChoice {
            index: 0,
            delta,
            finish_reason: None,
        });
        ChatEvent::Chunk(chunk)
    }

    fn empty_chunk(&self) -> ChatCompletionChunk {
        let (id, model, created) = self
            .meta
            .as_ref()
            .map(|m| (m.id.clone(), m.model.clone(), m.created))
            .unwrap_or_default();
        ChatCompletionChunk {
            id,
            object: "chat.completion.chunk".to_string(),
            created,
            model,
            choices: Vec::new(),
            usage: None,
        }
    }
}

impl FrameWriter for ChatWriter {
    type Event = ChatEvent;

    fn start(&mut self, meta: &ResponseMeta, _usage: Usage, out: &mut Vec<ChatEvent>) {
        self.meta = Some(meta.clone());
        out.push(self.chunk(ChunkDelta {
            role: Some("assistant".to_string()),
            content: Some(String::new()),
            ..ChunkDelta::default()
        }));
    }

    fn block_start(&mut self, block: &Block, out: &mut Vec<ChatEvent>) {
        if block.kind != BlockKind::ToolCall {
            return;
        }
        out.push(self.chunk(ChunkDelta {
            tool_calls: Some(vec![ChatToolCall {
                index: Some(u32::try_from(block.ordinal).unwrap_or(u32::MAX)),
                id: Some(block.id.clone()),
                kind: Some("function".to_string()),
                function: FunctionCall {
                    name: Some(block.name.clone()),
                    arguments: Some(String::new()),
                },
            }]),
            ..ChunkDelta::default()
        }));
    }

    fn text_delta(&mut self, _block: &Block, text: &str, out: &mut Vec<ChatEvent>) {
        out.push(self.chunk(ChunkDelta {
            content: Some(text.to_string()),
            ..ChunkDelta::default()
        }));
    }

    fn reasoning_delta(&mut self, _block: &Block, fragment: &Reasoning, out: &mut Vec<ChatEvent>) {
        let text = if fragment.text.is_empty() {
            &fragment.summary
        } else {
            &fragment.text
        };
        if text.is_empty() {
            return;
        }
        out.push(self.chunk(ChunkDelta {
            reasoning_content: Some(text.clone()),
            ..ChunkDelta::default()
        }));
    }

    fn arguments_delta(&mut self, block: &Block, arguments: &str, out: &mut Vec<ChatEvent>) {
        out.push(self.chunk(ChunkDelta {
            tool_calls: Some(vec![ChatToolCall {
                index: Some(u32::try_from(block.ordinal).unwrap_or(u32::MAX)),
                function: FunctionCall {
                    name: None,
                    arguments: Some(arguments.to_string()),
                },
                ..ChatToolCall::default()
            }]),
            ..ChunkDelta::default()
        }));
    }

    fn block_stop(&mut self, _block: &Block, _out: &mut Vec<ChatEvent>) {}

    fn finish(&mut self, completion: &Completion<'_>, out: &mut Vec<ChatEvent>) {
        let mut last = self.empty_chunk();
        last.choices.push(ChunkChoice {
            index: 0,
            delta: ChunkDelta::default(),
            finish_reason: Some(finish_reason(completion.reason)),
        });
        out.push(ChatEvent::Chunk(last));

        if self.include_usage {
            let mut usage_chunk = self.empty_chunk();
            usage_chunk.usage = Some(usage(completion.usage));
            out.push(ChatEvent::Chunk(usage_chunk));
        }
        out.push(ChatEvent::Done);
    }

    fn failure(&mut self, error: &GatewayError, out: &mut Vec<ChatEvent>) {
        out.push(ChatEvent::Error(error_response(error)));
        out.push(ChatEvent::Done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::StreamEmitter;
    use gateway_core::{Content, Delta, ToolCall};
    use serde_json::{json, Value};

    fn frames(events: &[ChatEvent]) -> Vec<String> {
        events.iter().map(|e| e.frame().data).collect()
    }

    fn json_of(event: &ChatEvent) -> Value {
        serde_json::from_str(&event.frame().data).unwrap()
    }

    #[test]
    fn test_text_stream_with_usage() {
        let mut emitter = StreamEmitter::new(
            ChatWriter::new().with_usage(true),
            ResponseMeta::new("chatcmpl-1", "gpt"),
        );
        let mut events = emitter.push(Delta::text("Hel"));
        events.extend(emitter.push(Delta::text("lo").with_usage(Usage::new(5, 2))));
        events.extend(emitter.finish());

        assert_eq!(events.len(), 6);
        let first = json_of(&events[0]);
        assert_eq!(first["object"], "chat.completion.chunk");
        assert_eq!(first["choices"][0]["delta"], json!({"role": "assistant", "content": ""}));
        assert_eq!(json_of(&events[1])["choices"][0]["delta"]["content"], "Hel");
        assert_eq!(json_of(&events[2])["choices"][0]["delta"]["content"], "lo");

        let last = json_of(&events[3]);
        assert_eq!(last["choices"][0]["finish_reason"], "stop");
        assert_eq!(last["choices"][0]["delta"], json!({}));

        let usage_chunk = json_of(&events[4]);
        assert_eq!(usage_chunk["choices"], json!([]));
        assert_eq!(usage_chunk["usage"]["total_tokens"], 7);

        assert_eq!(events[5], ChatEvent::Done);
        assert_eq!(events[5].frame().encode(), "data: [DONE]\n\n");
    }

    #[test]
    fn test_tool_calls_indexed_by_ordinal() {
        let mut emitter =
            StreamEmitter::new(ChatWriter::new(), ResponseMeta::new("chatcmpl-2", "gpt"));
        let mut events = emitter.push(Delta::content(Content::ToolCall(ToolCall::new(
            "call_a", "first", "{}",
        ))));
        events.extend(emitter.push(Delta::content(Content::ToolCall(ToolCall::new(
            "call_b", "second", "{\"x\":",
        )))));
        events.extend(emitter.push(Delta::content(Content::ToolCall(ToolCall::new("", "", "1}")))));
        events.extend(emitter.finish());

        let calls: Vec<Value> = events
            .iter()
            .filter(|e| matches!(e, ChatEvent::Chunk(_)))
            .map(json_of)
            .filter_map(|c| c["choices"][0]["delta"]["tool_calls"].get(0).cloned())
            .collect();

        assert_eq!(calls[0]["index"], 0);
        assert_eq!(calls[0]["id"], "call_a");
        assert_eq!(calls[0]["function"]["name"], "first");
        assert_eq!(calls[1]["index"], 0);
        assert_eq!(calls[1]["function"]["arguments"], "{}");
        assert_eq!(calls[2]["index"], 1);
        assert_eq!(calls[2]["id"], "call_b");
        assert_eq!(calls[4], json!({"index": 1, "function": {"arguments": "1}"}}));

        let finish = json_of(&events[events.len() - 2]);
        assert_eq!(finish["choices"][0]["finish_reason"], "tool_calls");
        assert_eq!(frames(&events).last().map(String::as_str), Some("[DONE]"));
    }

    #[test]
    fn test_no_usage_chunk_by_default() {
        let events = StreamEmitter::new(ChatWriter::new(), ResponseMeta::new("c", "m")).finish();
        assert_eq!(events.len(), 3);
        assert!(json_of(&events[1]).get("usage").is_none());
    }

    #[test]
    fn test_error_then_done() {
        let mut emitter = StreamEmitter::new(ChatWriter::new(), ResponseMeta::new("c", "m"));
        let events = emitter.fail(&GatewayError::unavailable("no backend"));

        assert_eq!(events.len(), 3);
        let error = json_of(&events[1]);
        assert_eq!(error["error"]["message"], "no backend");
        assert_eq!(events[2], ChatEvent::Done);
        assert!(emitter.fail(&GatewayError::internal("again")).is_empty());
    }
}
