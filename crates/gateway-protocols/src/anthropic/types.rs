//! Anthropic Messages API wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /v1/messages` request body
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesRequest {
    /// Requested model
    pub model: String,
    /// Conversation turns
    pub messages: Vec<InputMessage>,
    /// System prompt
    #[serde(default)]
    pub system: Option<SystemPrompt>,
    /// Output token limit
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Option<Vec<String>>,
    /// Stream the response
    #[serde(default)]
    pub stream: bool,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Tool definitions
    #[serde(default)]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Extended thinking configuration
    #[serde(default)]
    pub thinking: Option<ThinkingConfig>,
}

/// System prompt as text or text blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    /// Plain text
    Text(String),
    /// Text blocks
    Blocks(Vec<TextBlock>),
}

/// A text block of a system prompt
#[derive(Debug, Clone, Deserialize)]
pub struct TextBlock {
    /// Text
    pub text: String,
}

/// One conversation turn
#[derive(Debug, Clone, Deserialize)]
pub struct InputMessage {
    /// `user` or `assistant`
    pub role: String,
    /// Turn content
    pub content: InputContent,
}

/// Turn content as text or blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputContent {
    /// Plain text
    Text(String),
    /// Content blocks
    Blocks(Vec<InputBlock>),
}

/// Request content block
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputBlock {
    /// Text
    Text {
        /// Text
        text: String,
    },
    /// Image
    Image {
        /// Image source
        source: Source,
    },
    /// Document such as a PDF
    Document {
        /// Document source
        source: Source,
    },
    /// Earlier tool call by the assistant
    ToolUse {
        /// Call id
        id: String,
        /// Tool name
        name: String,
        /// Call arguments
        #[serde(default)]
        input: Value,
    },
    /// Tool output
    ToolResult {
        /// Id of the answered call
        tool_use_id: String,
        /// Output
        #[serde(default)]
        content: Option<ToolResultContent>,
    },
    /// Earlier extended thinking
    Thinking {
        /// Thinking text
        thinking: String,
        /// Thinking signature
        #[serde(default)]
        signature: String,
    },
    /// Earlier redacted thinking
    RedactedThinking {
        /// Encrypted thinking
        data: String,
    },
}

/// Binary source of an image or document
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    /// Inline base64 data
    Base64 {
        /// MIME type
        media_type: String,
        /// Base64 content
        data: String,
    },
    /// Remote URL
    Url {
        /// URL
        url: String,
    },
    /// Inline plain text document
    Text {
        /// MIME type
        #[serde(default)]
        media_type: Option<String>,
        /// Text content
        data: String,
    },
}

/// Tool output as text or blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    /// Plain text
    Text(String),
    /// Content blocks
    Blocks(Vec<InputBlock>),
}

/// Tool definition
#[derive(Debug, Clone, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema of the input
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Extended thinking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ThinkingConfig {
    /// `enabled` or `disabled`
    #[serde(rename = "type")]
    pub kind: String,
    /// Token budget for thinking
    #[serde(default)]
    pub budget_tokens: Option<u32>,
}

/// Non-streaming response body, also embedded in `message_start`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResponse {
    /// Message id
    pub id: String,
    /// Always `message`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Always `assistant`
    pub role: &'static str,
    /// Model name
    pub model: String,
    /// Content blocks
    pub content: Vec<ContentBlock>,
    /// Why generation stopped
    pub stop_reason: Option<StopReason>,
    /// Matched stop sequence
    pub stop_sequence: Option<String>,
    /// Token usage
    pub usage: Usage,
}

/// Response content block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text
    Text {
        /// Text
        text: String,
    },
    /// Tool call
    ToolUse {
        /// Call id
        id: String,
        /// Tool name
        name: String,
        /// Call arguments
        input: Value,
    },
    /// Extended thinking
    Thinking {
        /// Thinking text
        thinking: String,
        /// Thinking signature
        signature: String,
    },
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end
    EndTurn,
    /// Token limit
    MaxTokens,
    /// Stop sequence matched
    StopSequence,
    /// Tool call requested
    ToolUse,
    /// Output refused
    Refusal,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Generated tokens
    pub output_tokens: u32,
}

/// Streaming event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Response started
    MessageStart {
        /// Empty message carrying id, model and input usage
        message: MessageResponse,
    },
    /// Block opened
    ContentBlockStart {
        /// Block index
        index: usize,
        /// Empty block of the right type
        content_block: ContentBlock,
    },
    /// Block content
    ContentBlockDelta {
        /// Block index
        index: usize,
        /// Fragment
        delta: BlockDelta,
    },
    /// Block closed
    ContentBlockStop {
        /// Block index
        index: usize,
    },
    /// Final stop reason and usage
    MessageDelta {
        /// Stop information
        delta: MessageDeltaBody,
        /// Token usage
        usage: Usage,
    },
    /// Response finished
    MessageStop,
    /// Response failed
    Error {
        /// Error details
        error: ErrorBody,
    },
}

impl StreamEvent {
    /// SSE event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message_start",
            Self::ContentBlockStart { .. } => "content_block_start",
            Self::ContentBlockDelta { .. } => "content_block_delta",
            Self::ContentBlockStop { .. } => "content_block_stop",
            Self::MessageDelta { .. } => "message_delta",
            Self::MessageStop => "message_stop",
            Self::Error { .. } => "error",
        }
    }
}

/// Content fragment of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Text fragment
    TextDelta {
        /// Text
        text: String,
    },
    /// Tool argument fragment
    InputJsonDelta {
        /// Partial JSON
        partial_json: String,
    },
    /// Thinking fragment
    ThinkingDelta {
        /// Thinking text
        thinking: String,
    },
    /// Thinking signature
    SignatureDelta {
        /// Signature
        signature: String,
    },
}

/// Stop information of `message_delta`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDeltaBody {
    /// Why generation stopped
    pub stop_reason: StopReason,
    /// Matched stop sequence
    pub stop_sequence: Option<String>,
}

/// Error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Error type, e.g. `api_error`
    #[serde(rename = "type")]
    pub kind: String,
    /// Error message
    pub message: String,
}

/// Non-streaming error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Always `error`
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Error details
    pub error: ErrorBody,
}
