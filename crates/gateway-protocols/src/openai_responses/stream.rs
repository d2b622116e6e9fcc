//! Responses streaming events.
//!
//! Every block of the stream is one output item: text blocks become message
//! items with a single `output_text` part, tool blocks become function calls
//! and reasoning blocks become reasoning items. The writer numbers every
//! event it produces.

use super::convert::{failed_response, function_call_item, reasoning_item, status, usage};
use super::types::{OutputContent, OutputItem, Response, ResponseEvent};
use crate::convert::new_id;
use crate::emitter::{Block, BlockKind, Completion, FrameWriter, ResponseMeta};
use crate::sse::{to_json, ProtocolEvent, SseFrame};
use gateway_core::{GatewayError, Reasoning, ToolCall, Usage};

impl ProtocolEvent for ResponseEvent {
    fn frame(&self) -> SseFrame {
        SseFrame::named(self.name(), to_json(self))
    }
}

/// Renders the lifecycle as `response.*` events
#[derive(Debug, Default)]
pub struct ResponsesWriter {
    sequence: u64,
    meta: Option<ResponseMeta>,
    item_ids: Vec<String>,
}

impl ResponsesWriter {
    /// Create a writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        let n = self.sequence;
        self.sequence += 1;
        n
    }

    fn item_id(&self, block: &Block) -> String {
        self.item_ids.get(block.index).cloned().unwrap_or_default()
    }

    fn snapshot(&self, status: &'static str, output: Vec<OutputItem>) -> Response {
        let meta = self.meta.clone().unwrap_or_else(|| ResponseMeta::new("", ""));
        Response {
            id: meta.id,
            object: "response",
            created_at: meta.created,
            status,
            model: meta.model,
            output,
            usage: None,
            incomplete_details: None,
            error: None,
        }
    }

    fn message_item(&self, block: &Block, status: &'static str) -> OutputItem {
        OutputItem::Message {
            id: self.item_id(block),
            status,
            role: "assistant",
            content: if status == "completed" {
                vec![OutputContent::text(block.text.clone())]
            } else {
                Vec::new()
            },
        }
    }

    fn reasoning_item(&self, block: &Block) -> OutputItem {
        reasoning_item(
            self.item_id(block),
            &Reasoning {
                id: block.id.clone(),
                text: block.text.clone(),
                summary: block.summary.clone(),
                signature: block.signature.clone(),
            },
        )
    }
}

impl FrameWriter for ResponsesWriter {
    type Event = ResponseEvent;

    fn start(&mut self, meta: &ResponseMeta, _usage: Usage, out: &mut Vec<ResponseEvent>) {
        self.meta = Some(meta.clone());
        let created = ResponseEvent::Created {
            sequence_number: self.next(),
            response: self.snapshot("in_progress", Vec::new()),
        };
        out.push(created);
        let in_progress = ResponseEvent::InProgress {
            sequence_number: self.next(),
            response: self.snapshot("in_progress", Vec::new()),
        };
        out.push(in_progress);
    }

    fn block_start(&mut self, block: &Block, out: &mut Vec<ResponseEvent>) {
        let id = match block.kind {
            BlockKind::Text => new_id("msg"),
            BlockKind::Reasoning => new_id("rs"),
            BlockKind::ToolCall => block.id.clone(),
        };
        self.item_ids.push(id.clone());

        match block.kind {
            BlockKind::Text => {
                let item = self.message_item(block, "in_progress");
                out.push(ResponseEvent::OutputItemAdded {
                    sequence_number: self.next(),
                    output_index: block.index,
                    item,
                });
                out.push(ResponseEvent::ContentPartAdded {
                    sequence_number: self.next(),
                    item_id: id,
                    output_index: block.index,
                    content_index: 0,
                    part: OutputContent::text(""),
                });
            }
            BlockKind::Reasoning => {
                let item = OutputItem::Reasoning {
                    id,
                    summary: Vec::new(),
                    content: Vec::new(),
                    encrypted_content: None,
                };
                out.push(ResponseEvent::OutputItemAdded {
                    sequence_number: self.next(),
                    output_index: block.index,
                    item,
                });
            }
            BlockKind::ToolCall => {
                let item = function_call_item(
                    &ToolCall::new(block.id.clone(), block.name.clone(), ""),
                    "in_progress",
                );
                out.push(ResponseEvent::OutputItemAdded {
                    sequence_number: self.next(),
                    output_index: block.index,
                    item,
                });
            }
        }
    }

    fn text_delta(&mut self, block: &Block, text: &str, out: &mut Vec<ResponseEvent>) {
        out.push(ResponseEvent::OutputTextDelta {
            sequence_number: self.next(),
            item_id: self.item_id(block),
            output_index: block.index,
            content_index: 0,
            delta: text.to_string(),
        });
    }

    fn reasoning_delta(&mut self, block: &Block, fragment: &Reasoning, out: &mut Vec<ResponseEvent>) {
        if !fragment.text.is_empty() {
            out.push(ResponseEvent::ReasoningTextDelta {
                sequence_number: self.next(),
                item_id: self.item_id(block),
                output_index: block.index,
                content_index: 0,
                delta: fragment.text.clone(),
            });
        }
        if !fragment.summary.is_empty() {
            out.push(ResponseEvent::ReasoningSummaryTextDelta {
                sequence_number: self.next(),
                item_id: self.item_id(block),
                output_index: block.index,
                summary_index: 0,
                delta: fragment.summary.clone(),
            });
        }
    }

    fn arguments_delta(&mut self, block: &Block, arguments: &str, out: &mut Vec<ResponseEvent>) {
        out.push(ResponseEvent::FunctionCallArgumentsDelta {
            sequence_number: self.next(),
            item_id: self.item_id(block),
            output_index: block.index,
            delta: arguments.to_string(),
        });
    }

    fn block_stop(&mut self, block: &Block, out: &mut Vec<ResponseEvent>) {
        let item_id = self.item_id(block);
        match block.kind {
            BlockKind::Text => {
                out.push(ResponseEvent::OutputTextDone {
                    sequence_number: self.next(),
                    item_id: item_id.clone(),
                    output_index: block.index,
                    content_index: 0,
                    text: block.text.clone(),
                });
                out.push(ResponseEvent::ContentPartDone {
                    sequence_number: self.next(),
                    item_id,
                    output_index: block.index,
                    content_index: 0,
                    part: OutputContent::text(block.text.clone()),
                });
                let item = self.message_item(block, "completed");
                out.push(ResponseEvent::OutputItemDone {
                    sequence_number: self.next(),
                    output_index: block.index,
                    item,
                });
            }
            BlockKind::Reasoning => {
                if !block.text.is_empty() {
                    out.push(ResponseEvent::ReasoningTextDone {
                        sequence_number: self.next(),
                        item_id: item_id.clone(),
                        output_index: block.index,
                        content_index: 0,
                        text: block.text.clone(),
                    });
                }
                if !block.summary.is_empty() {
                    out.push(ResponseEvent::ReasoningSummaryTextDone {
                        sequence_number: self.next(),
                        item_id,
                        output_index: block.index,
                        summary_index: 0,
                        text: block.summary.clone(),
                    });
                }
                let item = self.reasoning_item(block);
                out.push(ResponseEvent::OutputItemDone {
                    sequence_number: self.next(),
                    output_index: block.index,
                    item,
                });
            }
            // Closed in `tool_call_done`, once the arguments are final
            BlockKind::ToolCall => {}
        }
    }

    fn tool_call_done(&mut self, block: &Block, call: &ToolCall, out: &mut Vec<ResponseEvent>) {
        out.push(ResponseEvent::FunctionCallArgumentsDone {
            sequence_number: self.next(),
            item_id: self.item_id(block),
            output_index: block.index,
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });
        out.push(ResponseEvent::OutputItemDone {
            sequence_number: self.next(),
            output_index: block.index,
            item: function_call_item(call, "completed"),
        });
    }

    fn finish(&mut self, completion: &Completion<'_>, out: &mut Vec<ResponseEvent>) {
        let calls = completion.message.tool_calls();
        let output = completion
            .blocks
            .iter()
            .map(|block| match block.kind {
                BlockKind::Text => self.message_item(block, "completed"),
                BlockKind::Reasoning => self.reasoning_item(block),
                BlockKind::ToolCall => {
                    let call = calls.iter().find(|c| c.id == block.id).map_or_else(
                        || ToolCall::new(block.id.clone(), block.name.clone(), block.text.clone()),
                        |c| (*c).clone(),
                    );
                    function_call_item(&call, "completed")
                }
            })
            .collect();

        let (status, incomplete_details) = status(completion.reason);
        let mut response = self.snapshot(status, output);
        response.usage = Some(usage(completion.usage));
        response.incomplete_details = incomplete_details;

        out.push(ResponseEvent::Completed {
            sequence_number: self.next(),
            response,
        });
    }

    fn failure(&mut self, error: &GatewayError, out: &mut Vec<ResponseEvent>) {
        let meta = self.meta.clone().unwrap_or_else(|| ResponseMeta::new("", ""));
        out.push(ResponseEvent::Failed {
            sequence_number: self.next(),
            response: failed_response(&meta, error),
        });
    }
}
