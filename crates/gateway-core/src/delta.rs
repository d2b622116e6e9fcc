//! Streamed completion fragments.

use crate::message::{Content, Message, Role};
use serde::{Deserialize, Serialize};

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end or stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// Model requested tool calls
    Tool,
    /// Output filtered
    Filter,
}

impl FinishReason {
    /// Wire name of the reason
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::Tool => "tool",
            Self::Filter => "filter",
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Generated tokens
    pub output_tokens: u32,
}

impl Usage {
    /// Create a usage record
    #[must_use]
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Input plus output tokens
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Whether both counters are zero
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

/// One streamed unit of a completion.
///
/// Every field is optional; a provider may send metadata, content and usage
/// in separate deltas or all at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Response id
    pub id: Option<String>,
    /// Model that produced the response
    pub model: Option<String>,
    /// Termination reason
    pub reason: Option<FinishReason>,
    /// Message fragment
    pub message: Option<Message>,
    /// Token usage
    pub usage: Option<Usage>,
}

impl Delta {
    /// Delta carrying one text fragment
    pub fn text(text: impl Into<String>) -> Self {
        Self::content(Content::Text(text.into()))
    }

    /// Delta carrying one content part from the assistant
    #[must_use]
    pub fn content(content: Content) -> Self {
        Self {
            message: Some(Message::new(Role::Assistant, vec![content])),
            ..Self::default()
        }
    }

    /// Set the response id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the termination reason
    #[must_use]
    pub fn with_reason(mut self, reason: FinishReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Set the usage
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Content parts of the fragment, empty when there is no message
    #[must_use]
    pub fn parts(&self) -> &[Content] {
        self.message.as_ref().map_or(&[], |m| m.content.as_slice())
    }

    /// Rewrite tool-call content as plain text.
    ///
    /// Used when the caller constrained the output to a schema and the
    /// backend answered through a tool call: the arguments are the answer.
    #[must_use]
    pub fn into_structured_text(mut self) -> Self {
        if let Some(message) = self.message.as_mut() {
            for part in &mut message.content {
                if let Content::ToolCall(call) = part {
                    *part = Content::Text(std::mem::take(&mut call.arguments));
                }
            }
        }
        if self.reason == Some(FinishReason::Tool) {
            self.reason = Some(FinishReason::Stop);
        }
        self
    }
}
