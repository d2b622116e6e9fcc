//! OpenAI Responses wire types.

use gateway_core::{Effort, Verbosity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /v1/responses` request body
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesRequest {
    /// Requested model
    pub model: String,
    /// Stream the response
    #[serde(default)]
    pub stream: bool,
    /// System instructions
    #[serde(default)]
    pub instructions: Option<String>,
    /// Conversation input
    pub input: ResponsesInput,
    /// Tool definitions
    #[serde(default)]
    pub tools: Option<Vec<ResponseTool>>,
    /// Text output configuration
    #[serde(default)]
    pub text: Option<TextConfig>,
    /// Output token limit
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Reasoning configuration
    #[serde(default)]
    pub reasoning: Option<ReasoningConfig>,
}

/// Input as a single prompt or a list of items
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsesInput {
    /// A single user prompt
    Text(String),
    /// Conversation items
    Items(Vec<InputItem>),
}

/// Conversation item; a message may omit its `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputItem {
    /// Item with an explicit type
    Typed(TypedItem),
    /// Bare `{role, content}` message
    Message(InputMessage),
}

/// Conversation item with an explicit type
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedItem {
    /// A message
    Message(InputMessage),
    /// Reasoning from an earlier turn
    Reasoning {
        /// Item id
        #[serde(default)]
        id: Option<String>,
        /// Summary parts
        #[serde(default)]
        summary: Vec<TextPart>,
        /// Reasoning text parts
        #[serde(default)]
        content: Option<Vec<TextPart>>,
        /// Opaque reasoning state
        #[serde(default)]
        encrypted_content: Option<String>,
    },
    /// A tool call made by the assistant
    FunctionCall {
        /// Item id
        #[serde(default)]
        id: Option<String>,
        /// Call id
        call_id: String,
        /// Function name
        name: String,
        /// JSON arguments
        #[serde(default)]
        arguments: String,
    },
    /// The result of a tool call
    FunctionCallOutput {
        /// Call id
        call_id: String,
        /// Tool output
        #[serde(default)]
        output: String,
    },
}

/// Message item
#[derive(Debug, Clone, Deserialize)]
pub struct InputMessage {
    /// `system`, `developer`, `user` or `assistant`
    pub role: String,
    /// Message content
    pub content: MessageContent,
}

/// Message content as text or parts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Content parts
    Parts(Vec<InputPart>),
}

/// Message content part
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputPart {
    /// User text
    InputText {
        /// Text
        text: String,
    },
    /// Assistant text from an earlier turn
    OutputText {
        /// Text
        text: String,
    },
    /// Refusal from an earlier turn
    Refusal {
        /// Refusal text
        refusal: String,
    },
    /// Image
    InputImage {
        /// `data:` URL
        #[serde(default)]
        image_url: Option<String>,
    },
    /// File
    InputFile {
        /// File name
        #[serde(default)]
        filename: Option<String>,
        /// `data:` URL
        #[serde(default)]
        file_data: Option<String>,
        /// Remote URL
        #[serde(default)]
        file_url: Option<String>,
    },
}

/// Typed text fragment (`summary_text`, `reasoning_text`, `output_text`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPart {
    /// Part type
    #[serde(rename = "type")]
    pub kind: String,
    /// Text
    pub text: String,
}

impl TextPart {
    pub(crate) fn new(kind: &str, text: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.into(),
        }
    }
}

/// Tool definition
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseTool {
    /// Tool type; only `function` is supported
    #[serde(rename = "type")]
    pub kind: String,
    /// Function name
    #[serde(default)]
    pub name: String,
    /// Function description
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema of the parameters
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Strict schema adherence
    #[serde(default)]
    pub strict: Option<bool>,
}

/// Text output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TextConfig {
    /// Output format
    #[serde(default)]
    pub format: Option<TextFormat>,
    /// Output verbosity
    #[serde(default)]
    pub verbosity: Option<Verbosity>,
}

/// Output format
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextFormat {
    /// Free text
    Text,
    /// Any JSON object
    JsonObject,
    /// JSON following a schema
    JsonSchema {
        /// Schema name
        name: String,
        /// Schema description
        #[serde(default)]
        description: Option<String>,
        /// The schema
        #[serde(default)]
        schema: Value,
        /// Strict adherence
        #[serde(default)]
        strict: Option<bool>,
    },
}

/// Reasoning configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    /// Reasoning effort
    #[serde(default)]
    pub effort: Option<Effort>,
}

/// Response object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Response id
    pub id: String,
    /// Always `response`
    pub object: &'static str,
    /// Unix timestamp
    pub created_at: i64,
    /// `in_progress`, `completed`, `incomplete` or `failed`
    pub status: &'static str,
    /// Model name
    pub model: String,
    /// Output items
    pub output: Vec<OutputItem>,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResponseUsage>,
    /// Why the response is incomplete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete_details: Option<IncompleteDetails>,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

/// Output item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant message
    Message {
        /// Item id
        id: String,
        /// Item status
        status: &'static str,
        /// Always `assistant`
        role: &'static str,
        /// Content parts
        content: Vec<OutputContent>,
    },
    /// Tool call
    FunctionCall {
        /// Item id
        id: String,
        /// Item status
        status: &'static str,
        /// Call id
        call_id: String,
        /// Function name
        name: String,
        /// JSON arguments
        arguments: String,
    },
    /// Reasoning
    Reasoning {
        /// Item id
        id: String,
        /// Summary parts
        summary: Vec<TextPart>,
        /// Reasoning text parts
        #[serde(skip_serializing_if = "Vec::is_empty")]
        content: Vec<TextPart>,
        /// Opaque reasoning state
        #[serde(skip_serializing_if = "Option::is_none")]
        encrypted_content: Option<String>,
    },
}

/// Message content part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    /// Text
    OutputText {
        /// Text
        text: String,
        /// Annotations, always empty
        annotations: Vec<Value>,
    },
    /// Refusal
    Refusal {
        /// Refusal text
        refusal: String,
    },
}

impl OutputContent {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self::OutputText {
            text: text.into(),
            annotations: Vec::new(),
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseUsage {
    /// Input tokens
    pub input_tokens: u32,
    /// Output tokens
    pub output_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

/// Why a response is incomplete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteDetails {
    /// Reason
    pub reason: &'static str,
}

/// Failure details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    /// Error code
    pub code: &'static str,
    /// Error message
    pub message: String,
}

/// Streaming event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ResponseEvent {
    /// Response created
    #[serde(rename = "response.created")]
    Created {
        /// Sequence number
        sequence_number: u64,
        /// Response snapshot
        response: Response,
    },
    /// Response in progress
    #[serde(rename = "response.in_progress")]
    InProgress {
        /// Sequence number
        sequence_number: u64,
        /// Response snapshot
        response: Response,
    },
    /// Output item opened
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// Sequence number
        sequence_number: u64,
        /// Output index
        output_index: usize,
        /// Item snapshot
        item: OutputItem,
    },
    /// Output item finished
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        /// Sequence number
        sequence_number: u64,
        /// Output index
        output_index: usize,
        /// Final item
        item: OutputItem,
    },
    /// Content part opened
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Content index
        content_index: usize,
        /// Part snapshot
        part: OutputContent,
    },
    /// Content part finished
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Content index
        content_index: usize,
        /// Final part
        part: OutputContent,
    },
    /// Text fragment
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Content index
        content_index: usize,
        /// Fragment
        delta: String,
    },
    /// Text finished
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Content index
        content_index: usize,
        /// Full text
        text: String,
    },
    /// Arguments fragment
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Fragment
        delta: String,
    },
    /// Arguments finished
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Function name
        name: String,
        /// Full arguments
        arguments: String,
    },
    /// Reasoning text fragment
    #[serde(rename = "response.reasoning_text.delta")]
    ReasoningTextDelta {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Content index
        content_index: usize,
        /// Fragment
        delta: String,
    },
    /// Reasoning text finished
    #[serde(rename = "response.reasoning_text.done")]
    ReasoningTextDone {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Content index
        content_index: usize,
        /// Full text
        text: String,
    },
    /// Reasoning summary fragment
    #[serde(rename = "response.reasoning_summary_text.delta")]
    ReasoningSummaryTextDelta {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Summary index
        summary_index: usize,
        /// Fragment
        delta: String,
    },
    /// Reasoning summary finished
    #[serde(rename = "response.reasoning_summary_text.done")]
    ReasoningSummaryTextDone {
        /// Sequence number
        sequence_number: u64,
        /// Item id
        item_id: String,
        /// Output index
        output_index: usize,
        /// Summary index
        summary_index: usize,
        /// Full summary
        text: String,
    },
    /// Response finished
    #[serde(rename = "response.completed")]
    Completed {
        /// Sequence number
        sequence_number: u64,
        /// Final response
        response: Response,
    },
    /// Response failed
    #[serde(rename = "response.failed")]
    Failed {
        /// Sequence number
        sequence_number: u64,
        /// Failed response
        response: Response,
    },
}

impl ResponseEvent {
    /// SSE event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "response.created",
            Self::InProgress { .. } => "response.in_progress",
            Self::OutputItemAdded { .. } => "response.output_item.added",
            Self::OutputItemDone { .. } => "response.output_item.done",
            Self::ContentPartAdded { .. } => "response.content_part.added",
            Self::ContentPartDone { .. } => "response.content_part.done",
            Self::OutputTextDelta { .. } => "response.output_text.delta",
            Self::OutputTextDone { .. } => "response.output_text.done",
            Self::FunctionCallArgumentsDelta { .. } => "response.function_call_arguments.delta",
            Self::FunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            Self::ReasoningTextDelta { .. } => "response.reasoning_text.delta",
            Self::ReasoningTextDone { .. } => "response.reasoning_text.done",
            Self::ReasoningSummaryTextDelta { .. } => "response.reasoning_summary_text.delta",
            Self::ReasoningSummaryTextDone { .. } => "response.reasoning_summary_text.done",
            Self::Completed { .. } => "response.completed",
            Self::Failed { .. } => "response.failed",
        }
    }

    /// Sequence number of the event
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        match self {
            Self::Created { sequence_number, .. }
            | Self::InProgress { sequence_number, .. }
            | Self::OutputItemAdded { sequence_number, .. }
            | Self::OutputItemDone { sequence_number, .. }
            | Self::ContentPartAdded { sequence_number, .. }
            | Self::ContentPartDone { sequence_number, .. }
            | Self::OutputTextDelta { sequence_number, .. }
            | Self::OutputTextDone { sequence_number, .. }
            | Self::FunctionCallArgumentsDelta { sequence_number, .. }
            | Self::FunctionCallArgumentsDone { sequence_number, .. }
            | Self::ReasoningTextDelta { sequence_number, .. }
            | Self::ReasoningTextDone { sequence_number, .. }
            | Self::ReasoningSummaryTextDelta { sequence_number, .. }
            | Self::ReasoningSummaryTextDone { sequence_number, .. }
            | Self::Completed { sequence_number, .. }
            | Self::Failed { sequence_number, .. } => *sequence_number,
        }
    }
}
