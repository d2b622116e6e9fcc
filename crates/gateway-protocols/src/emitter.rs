//! Protocol-independent streaming lifecycle.
//!
//! Every front-end protocol streams the same shape: a start event, a series
//! of content blocks (each opened, filled with deltas, and closed), and one
//! terminal event. [`StreamEmitter`] owns that lifecycle and the accumulated
//! result; a [`FrameWriter`] turns each lifecycle step into the protocol's
//! own events.

use crate::sse::ProtocolEvent;
use gateway_core::{
    Accumulator, Content, Delta, FinishReason, GatewayError, Message, Reasoning, ToolCall, Usage,
};
use tracing::trace;

/// Kind of content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Text or refusal output
    Text,
    /// Reasoning trace
    Reasoning,
    /// Tool call arguments
    ToolCall,
}

impl BlockKind {
    fn slot(self) -> usize {
        match self {
            Self::Text => 0,
            Self::Reasoning => 1,
            Self::ToolCall => 2,
        }
    }
}

/// A content block and everything streamed into it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block kind
    pub kind: BlockKind,
    /// Position among all blocks of the response
    pub index: usize,
    /// Position among blocks of the same kind
    pub ordinal: usize,
    /// Tool call id, or reasoning item id
    pub id: String,
    /// Tool name
    pub name: String,
    /// Text, reasoning text or tool arguments received so far
    pub text: String,
    /// Reasoning summary received so far
    pub summary: String,
    /// Reasoning signature
    pub signature: String,
}

impl Block {
    fn new(kind: BlockKind, index: usize, ordinal: usize) -> Self {
        Self {
            kind,
            index,
            ordinal,
            id: String::new(),
            name: String::new(),
            text: String::new(),
            summary: String::new(),
            signature: String::new(),
        }
    }
}

/// Identity of the response being streamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Response id exposed to the client
    pub id: String,
    /// Model name exposed to the client
    pub model: String,
    /// Creation time, seconds since the Unix epoch
    pub created: i64,
}

impl ResponseMeta {
    /// Create metadata stamped with the current time
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            created: chrono::Utc::now().timestamp(),
        }
    }
}

/// Final state handed to [`FrameWriter::finish`]
#[derive(Debug)]
pub struct Completion<'a> {
    /// Accumulated message
    pub message: &'a Message,
    /// Derived termination reason
    pub reason: FinishReason,
    /// Accumulated usage
    pub usage: Usage,
    /// Every block of the response, in order
    pub blocks: &'a [Block],
}

/// Per-protocol rendering of the streaming lifecycle.
///
/// The emitter guarantees `start` runs exactly once before any other call,
/// and that every `block_start` is matched by one `block_stop` unless the
/// stream fails.
pub trait FrameWriter {
    /// Event type of the protocol
    type Event: ProtocolEvent;

    /// The response has started
    fn start(&mut self, meta: &ResponseMeta, usage: Usage, out: &mut Vec<Self::Event>);

    /// A block was opened
    fn block_start(&mut self, block: &Block, out: &mut Vec<Self::Event>);

    /// Text was appended to a text block
    fn text_delta(&mut self, block: &Block, text: &str, out: &mut Vec<Self::Event>);

    /// A reasoning fragment was appended to a reasoning block
    fn reasoning_delta(&mut self, block: &Block, fragment: &Reasoning, out: &mut Vec<Self::Event>);

    /// Argument text was appended to a tool call block
    fn arguments_delta(&mut self, block: &Block, arguments: &str, out: &mut Vec<Self::Event>);

    /// A block was closed
    fn block_stop(&mut self, block: &Block, out: &mut Vec<Self::Event>);

    /// A tool call is complete; `call` carries the accumulated arguments
    fn tool_call_done(&mut self, _block: &Block, _call: &ToolCall, _out: &mut Vec<Self::Event>) {}

    /// The response finished normally
    fn finish(&mut self, completion: &Completion<'_>, out: &mut Vec<Self::Event>);

    /// The response failed mid-stream
    fn failure(&mut self, error: &GatewayError, out: &mut Vec<Self::Event>);
}

/// Drives a [`FrameWriter`] from a delta sequence
pub struct StreamEmitter<W: FrameWriter> {
    writer: W,
    meta: ResponseMeta,
    accumulator: Accumulator,
    structured: bool,
    started: bool,
    failed: bool,
    open: Option<Block>,
    closed: Vec<Block>,
    ordinals: [usize; 3],
    last_tool: Option<(String, String)>,
}

impl<W: FrameWriter> StreamEmitter<W> {
    /// Create an emitter
    pub fn new(writer: W, meta: ResponseMeta) -> Self {
        Self {
            writer,
            meta,
            accumulator: Accumulator::new(),
            structured: false,
            started: false,
            failed: false,
            open: None,
            closed: Vec::new(),
            ordinals: [0; 3],
            last_tool: None,
        }
    }

    /// Render tool-call output as text, for schema-constrained requests
    #[must_use]
    pub fn with_structured_output(mut self, structured: bool) -> Self {
        self.structured = structured;
        self
    }

    /// Response metadata
    #[must_use]
    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    /// Consume one delta
    pub fn push(&mut self, delta: Delta) -> Vec<W::Event> {
        let mut out = Vec::new();
        if self.failed {
            return out;
        }

        let mut delta = if self.structured {
            delta.into_structured_text()
        } else {
            delta
        };
        self.ensure_started(delta.usage.unwrap_or_default(), &mut out);

        // Tool fragments are re-attributed to the block that streamed them,
        // so the accumulated calls match the blocks one to one.
        let mut routed = Vec::with_capacity(delta.parts().len());
        for part in delta.parts() {
            match part {
                Content::Text(text) | Content::Refusal(text) => {
                    routed.push(part.clone());
                    if text.is_empty() {
                        continue;
                    }
                    self.enter(BlockKind::Text, &mut out);
                    if let Some(block) = self.open.as_mut() {
                        block.text.push_str(text);
                        self.writer.text_delta(block, text, &mut out);
                    }
                }
                Content::Reasoning(fragment) => {
                    routed.push(part.clone());
                    if fragment.is_empty() {
                        continue;
                    }
                    self.enter(BlockKind::Reasoning, &mut out);
                    if let Some(block) = self.open.as_mut() {
                        if !fragment.id.is_empty() {
                            block.id = fragment.id.clone();
                        }
                        if !fragment.signature.is_empty() {
                            block.signature = fragment.signature.clone();
                        }
                        block.text.push_str(&fragment.text);
                        block.summary.push_str(&fragment.summary);
                        self.writer.reasoning_delta(block, fragment, &mut out);
                    }
                }
                Content::ToolCall(fragment) => {
                    let Some(opened) = self.enter_tool(fragment, &mut out) else {
                        trace!("Dropping tool call fragment without a preceding id");
                        continue;
                    };
                    let Some(block) = self.open.as_mut() else {
                        continue;
                    };
                    routed.push(Content::ToolCall(ToolCall {
                        id: block.id.clone(),
                        name: if opened { block.name.clone() } else { String::new() },
                        arguments: fragment.arguments.clone(),
                    }));
                    if !fragment.arguments.is_empty() {
                        block.text.push_str(&fragment.arguments);
                        self.writer.arguments_delta(block, &fragment.arguments, &mut out);
                    }
                }
                Content::File(_) | Content::ToolResult(_) => {
                    routed.push(part.clone());
                    trace!("Skipping non-streamable content part");
                }
            }
        }

        if let Some(message) = delta.message.as_mut() {
            message.content = routed;
        }
        self.accumulator.add(&delta);
        out
    }

    /// Close the stream after the last delta
    pub fn finish(mut self) -> Vec<W::Event> {
        let mut out = Vec::new();
        if self.failed {
            return out;
        }

        self.ensure_started(Usage::default(), &mut out);
        self.close(&mut out);

        if self.closed.is_empty() {
            let block = Block::new(BlockKind::Text, 0, 0);
            self.writer.block_start(&block, &mut out);
            self.writer.block_stop(&block, &mut out);
            self.closed.push(block);
        }

        let result = self.accumulator.result();
        let message = result.message.unwrap_or_default();

        let calls = message.tool_calls();
        for call in &calls {
            let block = self
                .closed
                .iter()
                .find(|b| b.kind == BlockKind::ToolCall && b.id == call.id);
            if let Some(block) = block {
                self.writer.tool_call_done(block, call, &mut out);
            }
        }

        let reason = if calls.is_empty() {
            result.reason.unwrap_or(FinishReason::Stop)
        } else {
            FinishReason::Tool
        };

        let completion = Completion {
            message: &message,
            reason,
            usage: result.usage.unwrap_or_default(),
            blocks: &self.closed,
        };
        self.writer.finish(&completion, &mut out);
        out
    }

    /// Report a mid-stream error. Open blocks are left as they are.
    pub fn fail(&mut self, error: &GatewayError) -> Vec<W::Event> {
        let mut out = Vec::new();
        if self.failed {
            return out;
        }
        self.ensure_started(Usage::default(), &mut out);
        self.failed = true;
        self.writer.failure(error, &mut out);
        out
    }

    fn ensure_started(&mut self, usage: Usage, out: &mut Vec<W::Event>) {
        if !self.started {
            self.started = true;
            self.writer.start(&self.meta, usage, out);
        }
    }

    /// Make sure a block of `kind` is open
    fn enter(&mut self, kind: BlockKind, out: &mut Vec<W::Event>) {
        if self.open.as_ref().is_some_and(|b| b.kind == kind) {
            return;
        }
        self.close(out);
        self.open_block(kind, out, |_| {});
    }

    /// Make sure the right tool block is open.
    ///
    /// Returns whether a block was opened for the fragment, or `None` when
    /// the fragment cannot be attributed to any tool call. A call whose block
    /// was already closed continues in a new block named after the original
    /// call, under the id `{id}-{n}`. Closed blocks take no more arguments.
    fn enter_tool(&mut self, fragment: &ToolCall, out: &mut Vec<W::Event>) -> Option<bool> {
        let open_tool = self
            .open
            .as_ref()
            .filter(|b| b.kind == BlockKind::ToolCall)
            .map(|b| b.id.as_str());
        let open_origin = open_tool.and(self.last_tool.as_ref().map(|(origin, _)| origin.as_str()));
        let continues_open = !fragment.id.is_empty()
            && (open_tool == Some(fragment.id.as_str()) || open_origin == Some(fragment.id.as_str()));

        if continues_open || (fragment.id.is_empty() && open_tool.is_some()) {
            return Some(false);
        }

        let (origin, id, name) = if fragment.id.is_empty() {
            let (origin, name) = self.last_tool.clone()?;
            let id = self.continuation_id(&origin);
            (origin, id, name)
        } else {
            match self.tool_name(&fragment.id) {
                Some(name) => (fragment.id.clone(), self.continuation_id(&fragment.id), name),
                None => (fragment.id.clone(), fragment.id.clone(), fragment.name.clone()),
            }
        };

        self.close(out);
        self.last_tool = Some((origin, name.clone()));
        self.open_block(BlockKind::ToolCall, out, move |block| {
            block.id = id;
            block.name = name;
        });
        Some(true)
    }

    /// Name of an already streamed tool call
    fn tool_name(&self, id: &str) -> Option<String> {
        self.closed
            .iter()
            .chain(self.open.as_ref())
            .find(|b| b.kind == BlockKind::ToolCall && b.id == id)
            .map(|b| b.name.clone())
    }

    /// First `{id}-{n}` not taken by another tool block
    fn continuation_id(&self, id: &str) -> String {
        (2..)
            .map(|n| format!("{id}-{n}"))
            .find(|candidate| self.tool_name(candidate).is_none())
            .unwrap_or_else(|| id.to_string())
    }

    fn open_block(&mut self, kind: BlockKind, out: &mut Vec<W::Event>, init: impl FnOnce(&mut Block)) {
        let slot = kind.slot();
        let index = self.closed.len();
        let mut block = Block::new(kind, index, self.ordinals[slot]);
        self.ordinals[slot] += 1;
        init(&mut block);
        self.writer.block_start(&block, out);
        self.open = Some(block);
    }

    fn close(&mut self, out: &mut Vec<W::Event>) {
        if let Some(block) = self.open.take() {
            self.writer.block_stop(&block, out);
            self.closed.push(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::SseFrame;

    /// Records lifecycle calls as strings
    #[derive(Default)]
    struct Recorder;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Step(String);

    impl ProtocolEvent for Step {
        fn frame(&self) -> SseFrame {
            SseFrame::data(self.0.clone())
        }
    }

    impl FrameWriter for Recorder {
        type Event = Step;

        fn start(&mut self, meta: &ResponseMeta, _usage: Usage, out: &mut Vec<Step>) {
            out.push(Step(format!("start:{}", meta.id)));
        }

        fn block_start(&mut self, block: &Block, out: &mut Vec<Step>) {
            out.push(Step(format!("open:{:?}:{}", block.kind, block.index)));
        }

        fn text_delta(&mut self, block: &Block, text: &str, out: &mut Vec<Step>) {
            out.push(Step(format!("text:{}:{text}", block.index)));
        }

        fn reasoning_delta(&mut self, block: &Block, fragment: &Reasoning, out: &mut Vec<Step>) {
            out.push(Step(format!("reasoning:{}:{}", block.index, fragment.text)));
        }

        fn arguments_delta(&mut self, block: &Block, arguments: &str, out: &mut Vec<Step>) {
            out.push(Step(format!("args:{}:{arguments}", block.index)));
        }

        fn block_stop(&mut self, block: &Block, out: &mut Vec<Step>) {
            out.push(Step(format!("close:{:?}:{}", block.kind, block.index)));
        }

        fn tool_call_done(&mut self, block: &Block, call: &ToolCall, out: &mut Vec<Step>) {
            out.push(Step(format!("done:{}:{}", block.index, call.arguments)));
        }

        fn finish(&mut self, completion: &Completion<'_>, out: &mut Vec<Step>) {
            out.push(Step(format!(
                "finish:{}:{}",
                completion.reason.as_str(),
                completion.blocks.len()
            )));
        }

        fn failure(&mut self, error: &GatewayError, out: &mut Vec<Step>) {
            out.push(Step(format!("error:{}", error.message())));
        }
    }

    fn emitter() -> StreamEmitter<Recorder> {
        StreamEmitter::new(Recorder, ResponseMeta::new("r1", "m"))
    }

    fn tool(id: &str, name: &str, args: &str) -> Delta {
        Delta::content(Content::ToolCall(ToolCall::new(id, name, args)))
    }

    fn steps(events: Vec<Step>) -> Vec<String> {
        events.into_iter().map(|s| s.0).collect()
    }

    #[test]
    fn test_block_lifecycle_order() {
        let mut emitter = emitter();
        let mut events = Vec::new();
        events.extend(emitter.push(Delta::text("Hi")));
        events.extend(emitter.push(tool("call_1", "f", "{\"a\"")));
        events.extend(emitter.push(tool("", "", ":1}")));
        events.extend(emitter.finish());

        assert_eq!(
            steps(events),
            vec![
                "start:r1",
                "open:Text:0",
                "text:0:Hi",
                "close:Text:0",
                "open:ToolCall:1",
                "args:1:{\"a\"",
                "args:1::1}",
                "close:ToolCall:1",
                "done:1:{\"a\":1}",
                "finish:tool:2",
            ]
        );
    }

    #[test]
    fn test_new_tool_id_opens_new_block() {
        let mut emitter = emitter();
        let mut events = Vec::new();
        events.extend(emitter.push(tool("a", "f", "{}")));
        events.extend(emitter.push(tool("b", "g", "{}")));
        events.extend(emitter.finish());

        let steps = steps(events);
        assert!(steps.contains(&"close:ToolCall:0".to_string()));
        assert!(steps.contains(&"open:ToolCall:1".to_string()));
        assert_eq!(steps.last().map(String::as_str), Some("finish:tool:2"));
    }

    #[test]
    fn test_repeated_tool_id_continues_in_own_block() {
        let mut emitter = emitter();
        let mut events = Vec::new();
        events.extend(emitter.push(tool("a", "f", "{\"x\":")));
        events.extend(emitter.push(tool("b", "g", "{}")));
        events.extend(emitter.push(tool("a", "", "1}")));
        events.extend(emitter.finish());

        assert_eq!(
            steps(events),
            vec![
                "start:r1",
                "open:ToolCall:0",
                "args:0:{\"x\":",
                "close:ToolCall:0",
                "open:ToolCall:1",
                "args:1:{}",
                "close:ToolCall:1",
                "open:ToolCall:2",
                "args:2:1}",
                "close:ToolCall:2",
                "done:0:{\"x\":",
                "done:1:{}",
                "done:2:1}",
                "finish:tool:3",
            ]
        );
    }

    #[test]
    fn test_tool_continuation_after_text_gets_fresh_id() {
        let mut emitter = emitter();
        emitter.push(tool("t", "f", "{\"x\":"));
        emitter.push(Delta::text("hmm"));
        emitter.push(tool("", "", "1}"));
        emitter.push(tool("t", "", "2"));

        let ids: Vec<_> = emitter
            .closed
            .iter()
            .chain(emitter.open.as_ref())
            .filter(|b| b.kind == BlockKind::ToolCall)
            .map(|b| (b.id.clone(), b.name.clone(), b.text.clone()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("t".to_string(), "f".to_string(), "{\"x\":".to_string()),
                ("t-2".to_string(), "f".to_string(), "1}2".to_string()),
            ]
        );

        let calls = emitter.accumulator.tool_calls().to_vec();
        assert_eq!(
            calls,
            vec![ToolCall::new("t", "f", "{\"x\":"), ToolCall::new("t-2", "f", "1}2")]
        );
    }

    #[test]
    fn test_consecutive_text_stays_in_one_block() {
        let mut emitter = emitter();
        let mut events = Vec::new();
        for chunk in ["a", "b", "", "c"] {
            events.extend(emitter.push(Delta::text(chunk)));
        }
        events.extend(emitter.finish());

        assert_eq!(
            steps(events),
            vec![
                "start:r1",
                "open:Text:0",
                "text:0:a",
                "text:0:b",
                "text:0:c",
                "close:Text:0",
                "finish:stop:1",
            ]
        );
    }

    #[test]
    fn test_reasoning_then_text() {
        let mut emitter = emitter();
        let mut events = Vec::new();
        events.extend(emitter.push(Delta::content(Content::Reasoning(Reasoning {
            text: "hmm".into(),
            ..Reasoning::default()
        }))));
        events.extend(emitter.push(Delta::text("answer").with_reason(FinishReason::Length)));
        events.extend(emitter.finish());

        assert_eq!(
            steps(events),
            vec![
                "start:r1",
                "open:Reasoning:0",
                "reasoning:0:hmm",
                "close:Reasoning:0",
                "open:Text:1",
                "text:1:answer",
                "close:Text:1",
                "finish:length:2",
            ]
        );
    }

    #[test]
    fn test_empty_response_gets_empty_text_block() {
        let emitter = emitter();
        assert_eq!(
            steps(emitter.finish()),
            vec!["start:r1", "open:Text:0", "close:Text:0", "finish:stop:1"]
        );
    }

    #[test]
    fn test_orphan_tool_fragment_dropped() {
        let mut emitter = emitter();
        let events = emitter.push(tool("", "", "{\"lost\":1}"));
        assert_eq!(steps(events), vec!["start:r1"]);
    }

    #[test]
    fn test_failure_does_not_close_blocks() {
        let mut emitter = emitter();
        let mut events = emitter.push(Delta::text("partial"));
        events.extend(emitter.fail(&GatewayError::provider("p", "reset", None, true)));
        events.extend(emitter.push(Delta::text("ignored")));

        assert_eq!(
            steps(events),
            vec!["start:r1", "open:Text:0", "text:0:partial", "error:reset"]
        );
        assert!(emitter.finish().is_empty());
    }

    #[test]
    fn test_failure_before_content_starts_stream() {
        let mut emitter = emitter();
        let events = emitter.fail(&GatewayError::unavailable("none"));
        assert_eq!(steps(events), vec!["start:r1", "error:none"]);
    }

    #[test]
    fn test_structured_output_renders_tool_as_text() {
        let mut emitter = emitter().with_structured_output(true);
        let mut events = Vec::new();
        events.extend(emitter.push(tool("c", "answer", "{\"x\":")));
        events.extend(emitter.push(tool("", "", "1}")));
        events.extend(emitter.finish());

        assert_eq!(
            steps(events),
            vec![
                "start:r1",
                "open:Text:0",
                "text:0:{\"x\":",
                "text:0:1}",
                "close:Text:0",
                "finish:stop:1",
            ]
        );
    }
}
