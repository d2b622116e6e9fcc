//! Folding a delta sequence into one final message.

use crate::delta::{Delta, FinishReason, Usage};
use crate::message::{Content, Message, Reasoning, Role, ToolCall};
use tracing::trace;

/// Folds streamed deltas into a single result.
///
/// Feeding the same content in a different chunking produces the same result
/// as long as order is preserved and each tool call's id arrives on its first
/// fragment. Calling [`Accumulator::result`] consumes the accumulator.
#[derive(Debug, Default)]
pub struct Accumulator {
    id: Option<String>,
    model: Option<String>,
    role: Option<Role>,
    reason: Option<FinishReason>,
    usage: Usage,
    text: String,
    refusal: String,
    reasoning: Option<Reasoning>,
    tool_calls: Vec<ToolCall>,
    current_call: Option<usize>,
    attachments: Vec<Content>,
}

impl Accumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one delta into the running state
    pub fn add(&mut self, delta: &Delta) {
        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            self.id = Some(id.to_string());
        }
        if let Some(model) = delta.model.as_deref().filter(|m| !m.is_empty()) {
            self.model = Some(model.to_string());
        }
        if let Some(reason) = delta.reason {
            self.reason = Some(reason);
        }
        if let Some(usage) = delta.usage {
            // Providers report running totals, so the latest non-zero value wins.
            if usage.input_tokens > 0 {
                self.usage.input_tokens = usage.input_tokens;
            }
            if usage.output_tokens > 0 {
                self.usage.output_tokens = usage.output_tokens;
            }
        }

        let Some(message) = delta.message.as_ref() else {
            return;
        };
        self.role = Some(message.role);

        for part in &message.content {
            match part {
                Content::Text(text) => self.text.push_str(text),
                Content::Refusal(text) => self.refusal.push_str(text),
                Content::Reasoning(fragment) => self.add_reasoning(fragment),
                Content::ToolCall(fragment) => self.add_tool_call(fragment),
                Content::File(_) | Content::ToolResult(_) => self.attachments.push(part.clone()),
            }
        }
    }

    fn add_reasoning(&mut self, fragment: &Reasoning) {
        let reasoning = self.reasoning.get_or_insert_with(Reasoning::default);
        if !fragment.id.is_empty() {
            reasoning.id = fragment.id.clone();
        }
        if !fragment.signature.is_empty() {
            reasoning.signature = fragment.signature.clone();
        }
        reasoning.text.push_str(&fragment.text);
        reasoning.summary.push_str(&fragment.summary);
    }

    fn add_tool_call(&mut self, fragment: &ToolCall) {
        if !fragment.id.is_empty() {
            let index = match self.tool_calls.iter().position(|c| c.id == fragment.id) {
                Some(index) => index,
                None => {
                    self.tool_calls.push(ToolCall {
                        id: fragment.id.clone(),
                        ..ToolCall::default()
                    });
                    self.tool_calls.len() - 1
                }
            };
            self.current_call = Some(index);
        }

        let Some(index) = self.current_call else {
            trace!(
                arguments = %fragment.arguments,
                "Dropping tool call fragment without a preceding id"
            );
            return;
        };

        let call = &mut self.tool_calls[index];
        call.name.push_str(&fragment.name);
        call.arguments.push_str(&fragment.arguments);
    }

    /// Tool calls accumulated so far
    #[must_use]
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// Usage accumulated so far
    #[must_use]
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Produce the final result
    #[must_use]
    pub fn result(self) -> Delta {
        let mut content = Vec::new();

        if let Some(reasoning) = self.reasoning.filter(|r| !r.is_empty()) {
            content.push(Content::Reasoning(reasoning));
        }
        if !self.text.is_empty() {
            content.push(Content::Text(self.text));
        }
        if !self.refusal.is_empty() {
            content.push(Content::Refusal(self.refusal));
        }
        content.extend(self.attachments);
        content.extend(self.tool_calls.into_iter().map(Content::ToolCall));

        Delta {
            id: self.id,
            model: self.model,
            reason: self.reason,
            message: Some(Message::new(self.role.unwrap_or(Role::Assistant), content)),
            usage: (!self.usage.is_zero()).then_some(self.usage),
        }
    }
}
