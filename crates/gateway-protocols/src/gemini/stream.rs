//! Gemini streamed chunks.
//!
//! Gemini has no block framing: text and thoughts go out as they arrive,
//! function calls are held back for the final chunk, which also carries the
//! finish reason and usage.

use super::convert::{error_response, finish_reason, function_call_part, thought_part, usage_metadata};
use super::types::{Candidate, Content, GeminiEvent, GenerateContentResponse, Part};
use crate::emitter::{Block, Completion, FrameWriter, ResponseMeta};
use crate::sse::{to_json, ProtocolEvent, SseFrame};
use gateway_core::{GatewayError, Reasoning, Usage};

impl ProtocolEvent for GeminiEvent {
    fn frame(&self) -> SseFrame {
        match self {
            Self::Chunk(chunk) => SseFrame::data(to_json(chunk)),
            Self::Error(error) => SseFrame::data(to_json(error)),
        }
    }
}

/// Renders the lifecycle as `GenerateContentResponse` chunks
#[derive(Debug, Default)]
pub struct GeminiWriter {
    meta: Option<ResponseMeta>,
}

impl GeminiWriter {
    /// Create a writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn chunk(&self, candidate: Candidate) -> GenerateContentResponse {
        let (response_id, model_version) = self
            .meta
            .as_ref()
            .map(|m| (m.id.clone(), m.model.clone()))
            .unwrap_or_default();
        GenerateContentResponse {
            response_id,
            model_version,
            candidates: vec![candidate],
            usage_metadata: None,
        }
    }

    fn part_chunk(&self, part: Part) -> GeminiEvent {
        GeminiEvent::Chunk(self.chunk(Candidate {
            content: Some(Content {
                role: "model".to_string(),
                parts: vec![part],
            }),
            finish_reason: None,
            index: 0,
        }))
    }
}

impl FrameWriter for GeminiWriter {
    type Event = GeminiEvent;

    fn start(&mut self, meta: &ResponseMeta, _usage: Usage, _out: &mut Vec<GeminiEvent>) {
        self.meta = Some(meta.clone());
    }

    fn block_start(&mut self, _block: &Block, _out: &mut Vec<GeminiEvent>) {}

    fn text_delta(&mut self, _block: &Block, text: &str, out: &mut Vec<GeminiEvent>) {
        out.push(self.part_chunk(Part {
            text: Some(text.to_string()),
            ..Part::default()
        }));
    }

    fn reasoning_delta(&mut self, _block: &Block, fragment: &Reasoning, out: &mut Vec<GeminiEvent>) {
        let text = if fragment.text.is_empty() {
            &fragment.summary
        } else {
            &fragment.text
        };
        if text.is_empty() && fragment.signature.is_empty() {
            return;
        }
        out.push(self.part_chunk(thought_part(text, &fragment.signature)));
    }

    fn arguments_delta(&mut self, _block: &Block, _arguments: &str, _out: &mut Vec<GeminiEvent>) {}

    fn block_stop(&mut self, _block: &Block, _out: &mut Vec<GeminiEvent>) {}

    fn finish(&mut self, completion: &Completion<'_>, out: &mut Vec<GeminiEvent>) {
        let calls: Vec<Part> = completion
            .message
            .tool_calls()
            .into_iter()
            .map(function_call_part)
            .collect();

        let mut last = self.chunk(Candidate {
            content: (!calls.is_empty()).then(|| Content {
                role: "model".to_string(),
                parts: calls,
            }),
            finish_reason: Some(finish_reason(completion.reason)),
            index: 0,
        });
        last.usage_metadata = Some(usage_metadata(completion.usage));
        out.push(GeminiEvent::Chunk(last));
    }

    fn failure(&mut self, error: &GatewayError, out: &mut Vec<GeminiEvent>) {
        out.push(GeminiEvent::Error(error_response(error)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::StreamEmitter;
    use gateway_core::{Content as Fragment, Delta, FinishReason, ToolCall};
    use serde_json::{json, Value};

    fn emitter() -> StreamEmitter<GeminiWriter> {
        StreamEmitter::new(GeminiWriter::new(), ResponseMeta::new("resp_1", "gemini"))
    }

    fn body(event: &GeminiEvent) -> Value {
        serde_json::from_str(&event.frame().data).unwrap()
    }

    #[test]
    fn test_text_then_function_call() {
        let mut emitter = emitter();
        let mut events = emitter.push(Delta::text("Checking"));
        events.extend(emitter.push(Delta::content(Fragment::ToolCall(ToolCall::new(
            "call_1", "weather", "{\"city\":",
        )))));
        events.extend(emitter.push(Delta::content(Fragment::ToolCall(ToolCall::new("", "", "\"Oslo\"}")))));
        events.extend(emitter.push(Delta::default().with_usage(Usage::new(2, 3))));
        events.extend(emitter.finish());

        assert_eq!(events.len(), 2);
        assert_eq!(
            body(&events[0])["candidates"][0]["content"],
            json!({"role": "model", "parts": [{"text": "Checking"}]})
        );

        let last = body(&events[1]);
        assert_eq!(last["candidates"][0]["finishReason"], "STOP");
        assert_eq!(
            last["candidates"][0]["content"]["parts"][0]["functionCall"],
            json!({"id": "call_1", "name": "weather", "args": {"city": "Oslo"}})
        );
        assert_eq!(last["usageMetadata"]["totalTokenCount"], 5);
        assert_eq!(last["responseId"], "resp_1");
    }

    #[test]
    fn test_thoughts_are_marked() {
        let mut emitter = emitter();
        let events = emitter.push(Delta::content(Fragment::Reasoning(Reasoning {
            text: "hmm".into(),
            signature: "sig".into(),
            ..Reasoning::default()
        })));

        assert_eq!(
            body(&events[0])["candidates"][0]["content"]["parts"][0],
            json!({"text": "hmm", "thought": true, "thoughtSignature": "sig"})
        );
    }

    #[test]
    fn test_empty_and_truncated() {
        let events = emitter().finish();
        assert_eq!(events.len(), 1);
        let last = body(&events[0]);
        assert_eq!(last["candidates"][0]["finishReason"], "STOP");
        assert!(last["candidates"][0].get("content").is_none());

        let mut emitter = emitter();
        let mut events = emitter.push(Delta::text("cut").with_reason(FinishReason::Length));
        events.extend(emitter.finish());
        assert_eq!(body(&events[1])["candidates"][0]["finishReason"], "MAX_TOKENS");
    }

    #[test]
    fn test_error_chunk() {
        let mut emitter = emitter();
        let events = emitter.fail(&GatewayError::provider("p", "bad schema", Some(400), false));
        assert_eq!(events.len(), 1);
        assert_eq!(
            body(&events[0]),
            json!({"error": {"code": 400, "message": "bad schema", "status": "INVALID_ARGUMENT"}})
        );
    }
}
